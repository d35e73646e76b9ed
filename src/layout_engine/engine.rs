use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, instrument, trace, warn};

use crate::common::collections::HashMap;
use crate::common::config::LayoutSettings;
use crate::layout_engine::config::LayoutConfig;
use crate::layout_engine::document::DocumentGroup;
use crate::layout_engine::drag::{DragInfo, DragOutcome, DragSource, DropProposal};
use crate::layout_engine::error::LayoutError;
use crate::layout_engine::events::{
    CursorStyle, EventResponse, LayoutEvent, LayoutObserver, PointerEvent, PointerKind,
    TabMenuAction,
};
use crate::layout_engine::graph::{DirLink, Orientation, Side, TabPlacement};
use crate::layout_engine::group::{DropTarget, Group, LeafGroup};
use crate::layout_engine::resize::{SeparatorDrag, layout_subtree};
use crate::layout_engine::serialize::{GroupConfig, LayoutNodeConfig, PanelSerializer};
use crate::layout_engine::tree::{LayoutTree, NodeId, NodeKind};
use crate::model::focus::{FocusContext, LayoutKey, focus_panel};
use crate::model::panel::{GroupLocation, Panel, PanelRef};
use crate::model::tab_group::TabGroup;
use crate::sys::geometry::{Matrix, Point, Rect, Size};
use crate::ui::drag_feedback::{Overlay, OverlayKind};
use crate::ui::surface::{HostSurface, Renderable};
use crate::ui::tab_bar::TitleRenderFactory;

const MASK_Z: i32 = 5;
const GHOST_Z: i32 = 6;

/// Panels known by id. Shared with nested document layouts so restores and
/// opens inside a document resolve the same ids.
pub type PanelRegistry = Rc<RefCell<HashMap<String, PanelRef>>>;

enum Gesture {
    Idle,
    Separator(SeparatorDrag),
    TabPress {
        element: NodeId,
        index: usize,
        start: Point,
    },
    Dragging(DragInfo),
    /// A document leaf's nested layout owns the pointer.
    Forwarded(NodeId),
}

/// The box layout controller.
///
/// Owns the node arena, the maximize state, the panel registry and the
/// closed-panel cache, and drives pointer gestures. All coordinates kept in
/// the tree are local to the controller's area; pointer input arrives in host
/// coordinates and is mapped through the inverse of `transform`.
pub struct BoxLayout {
    key: LayoutKey,
    focus: FocusContext,
    config: LayoutConfig,
    tree: LayoutTree,
    area: Size,
    transform: Matrix,
    maximized: Option<NodeId>,
    cache_size: Size,
    registry: PanelRegistry,
    closed_links: HashMap<String, DirLink>,
    gesture: Gesture,
    mask: Overlay,
    ghost: Overlay,
    observers: Vec<Box<dyn LayoutObserver>>,
    events: Vec<LayoutEvent>,
}

impl BoxLayout {
    pub fn new(focus: FocusContext) -> Self { Self::with_config(focus, LayoutConfig::default()) }

    pub fn with_config(focus: FocusContext, config: LayoutConfig) -> Self {
        Self::with_registry(focus, config, PanelRegistry::default())
    }

    fn with_registry(focus: FocusContext, config: LayoutConfig, registry: PanelRegistry) -> Self {
        let key = focus.borrow_mut().register_layout();
        let mut mask = Overlay::new(OverlayKind::Mask);
        mask.set_z_index(MASK_Z);
        let mut ghost = Overlay::new(OverlayKind::DragGhost);
        ghost.set_z_index(GHOST_Z);
        Self {
            key,
            focus,
            config,
            tree: LayoutTree::default(),
            area: Size::ZERO,
            transform: Matrix::IDENTITY,
            maximized: None,
            cache_size: Size::ZERO,
            registry,
            closed_links: HashMap::default(),
            gesture: Gesture::Idle,
            mask,
            ghost,
            observers: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn key(&self) -> LayoutKey { self.key }

    pub fn focus_context(&self) -> &FocusContext { &self.focus }

    pub fn config(&self) -> &LayoutConfig { &self.config }

    pub fn settings(&self) -> &LayoutSettings { &self.config.settings }

    pub fn tree(&self) -> &LayoutTree { &self.tree }

    pub fn root(&self) -> Option<NodeId> { self.tree.root() }

    pub fn area(&self) -> Size { self.area }

    pub fn transform(&self) -> Matrix { self.transform }

    pub fn maximized(&self) -> Option<NodeId> { self.maximized }

    pub fn node_bounds(&self, id: NodeId) -> Option<Rect> { self.tree.bounds(id) }

    pub fn tab_group(&self, id: NodeId) -> Option<&TabGroup> { self.tree.tab_group(id) }

    pub fn document_layout(&self, id: NodeId) -> Option<&BoxLayout> {
        Some(self.tree.group(id)?.as_document()?.layout())
    }

    pub fn document_layout_mut(&mut self, id: NodeId) -> Option<&mut BoxLayout> {
        Some(self.tree.group_mut(id)?.as_document_mut()?.layout_mut())
    }

    fn host(&self) -> HostSurface { HostSurface::new(self.key) }

    // Configuration

    pub fn set_use_tab_menu(&mut self, use_tab_menu: bool) {
        if self.config.settings.use_tab_menu == use_tab_menu {
            return;
        }
        self.config.settings.use_tab_menu = use_tab_menu;
        for leaf in self.all_tab_groups() {
            if let Some(group) = self.tree.tab_group_mut(leaf) {
                group.tab_bar_mut().set_show_menu(use_tab_menu);
            }
        }
        self.emit(LayoutEvent::ConfigChanged);
    }

    pub fn set_title_render_factory(&mut self, factory: Rc<dyn TitleRenderFactory>) {
        self.config.title_render_factory = factory.clone();
        for leaf in self.all_tab_groups() {
            if let Some(group) = self.tree.tab_group_mut(leaf) {
                group.tab_bar_mut().set_factory(factory.clone());
            }
        }
        self.emit(LayoutEvent::ConfigChanged);
    }

    pub fn set_document_title_render_factory(&mut self, factory: Rc<dyn TitleRenderFactory>) {
        self.config.document_title_render_factory = factory.clone();
        for leaf in self.document_elements() {
            if let Some(nested) = self.document_layout_mut(leaf) {
                nested.set_title_render_factory(factory.clone());
            }
        }
        self.emit(LayoutEvent::ConfigChanged);
    }

    pub fn set_panel_serializer(&mut self, serializer: Rc<dyn PanelSerializer>) {
        self.config.panel_serializer = serializer;
        self.emit(LayoutEvent::ConfigChanged);
    }

    pub fn set_document_panel_serializer(&mut self, serializer: Rc<dyn PanelSerializer>) {
        self.config.document_panel_serializer = serializer.clone();
        for leaf in self.document_elements() {
            if let Some(nested) = self.document_layout_mut(leaf) {
                nested.config.panel_serializer = serializer.clone();
            }
        }
        self.emit(LayoutEvent::ConfigChanged);
    }

    // Events

    pub fn add_observer(&mut self, observer: Box<dyn LayoutObserver>) {
        self.observers.push(observer);
    }

    /// Drains queued events in the order they happened.
    pub fn take_events(&mut self) -> Vec<LayoutEvent> { std::mem::take(&mut self.events) }

    fn emit(&mut self, event: LayoutEvent) {
        trace!(?event, "layout event");
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
        self.events.push(event);
    }

    fn allow_removal(&mut self, panel: &PanelRef, element: NodeId) -> bool {
        self.observers.iter_mut().all(|o| o.panel_removing(panel, element))
    }

    // Area and geometry

    /// Resizes the controller's area and relays out everything.
    pub fn set_area(&mut self, area: Size, transform: Matrix) {
        self.area = area;
        self.transform = transform;
        self.update_box_element();
    }

    fn update_box_element(&mut self) {
        let Some(node) = self.maximized.or(self.tree.root()) else {
            return;
        };
        if let Some(n) = self.tree.node_mut(node) {
            n.bounds = Rect::from_parts(Point::ZERO, self.area);
            n.explicit = self.area;
        }
        layout_subtree(&mut self.tree, node, &self.transform);
    }

    pub fn global_to_local(&self, p: Point) -> Point { self.transform.invert().transform_point(p) }

    pub fn local_to_global(&self, p: Point) -> Point { self.transform.transform_point(p) }

    /// Repaints every tab item, e.g. after panel titles changed.
    pub fn refresh_titles(&mut self) {
        for leaf in self.all_tab_groups() {
            if let Some(group) = self.tree.tab_group_mut(leaf) {
                group.tab_bar_mut().refresh();
            }
        }
        for leaf in self.document_elements() {
            if let Some(nested) = self.document_layout_mut(leaf) {
                nested.refresh_titles();
            }
        }
    }

    // Elements

    /// Creates a detached, empty tab group element.
    pub fn create_element(&mut self) -> NodeId {
        let group = TabGroup::new(&self.config.settings, self.config.title_render_factory.clone());
        self.insert_leaf(Group::Tabs(group))
    }

    /// Creates a detached document element with its own nested layout.
    pub fn create_document_element(&mut self) -> NodeId {
        let config = LayoutConfig {
            settings: self.config.settings.clone(),
            title_render_factory: self.config.document_title_render_factory.clone(),
            document_title_render_factory: self.config.document_title_render_factory.clone(),
            panel_serializer: self.config.document_panel_serializer.clone(),
            document_panel_serializer: self.config.document_panel_serializer.clone(),
        };
        let mut nested = BoxLayout::with_registry(self.focus.clone(), config, self.registry.clone());
        let root = nested.create_element();
        nested.add_box_element_to_root(root, Side::Right);
        self.insert_leaf(Group::Document(DocumentGroup::new(nested)))
    }

    fn insert_leaf(&mut self, group: Group) -> NodeId {
        let layout = self.key;
        self.tree.insert_leaf_with(|node| {
            let mut group = group;
            group.bind(GroupLocation { layout, node });
            group
        })
    }

    pub fn add_box_element_to_root(&mut self, element: NodeId, side: Side) {
        if !self.tree.contains(element) {
            return;
        }
        let Some(root) = self.tree.root() else {
            if self.tree.parent(element).is_some() {
                warn!(?element, "cannot make a nested node the root");
                return;
            }
            self.set_maximized_internal(None);
            self.tree.set_root(Some(element));
            self.attach_subtree(element);
            self.update_box_element();
            return;
        };
        self.add_box_element(root, element, side);
    }

    /// Docks `element` on `side` of `target`, splitting target's slot into a new
    /// container. `element` may currently live elsewhere in the tree; it is
    /// moved. Both halves start at half the target's size.
    #[instrument(skip(self))]
    pub fn add_box_element(&mut self, target: NodeId, element: NodeId, side: Side) {
        if target == element || Some(element) == self.tree.root() {
            return;
        }
        if !self.tree.is_attached(target) || self.tree.is_ancestor(element, target) {
            warn!(?target, ?element, "invalid dock target");
            return;
        }
        let element_attached = self.tree.is_attached(element);
        if !element_attached && self.tree.parent(element).is_some() {
            warn!(?element, "element belongs to a detached container");
            return;
        }
        self.set_maximized_internal(None);

        let mut target = target;
        if self.tree.parent(element) == Some(target) {
            match self.tree.sibling(element) {
                Some(sibling) => target = sibling,
                None => return,
            }
        }

        self.set_subtree_hold(element, true);
        self.remove_box_element(element);

        let Some(target_bounds) = self.tree.bounds(target) else { return };
        let target_parent = self.tree.parent(target);
        let (first, second) = if side.is_leading() { (element, target) } else { (target, element) };
        let gap = self.config.settings.gap;
        let separator = self.config.settings.separator_size;
        let container = self.tree.insert_container(first, second, side.orientation(), gap, separator);

        match target_parent {
            Some(parent) => self.tree.replace_child(parent, target, container),
            None => self.tree.set_root(Some(container)),
        }

        let host = self.host();
        if let Some(c) = self.tree.container_mut(container) {
            c.separator.render(&host);
        }
        self.attach_subtree(element);
        self.set_subtree_hold(element, false);

        let half = Size::new(target_bounds.w / 2.0, target_bounds.h / 2.0);
        self.tree.set_size(container, target_bounds.size());
        self.tree.set_size(element, half);
        self.tree.set_size(target, half);
        debug!(?target, ?element, %side, "docked element");
        self.update_box_element();
    }

    /// Detaches `element` from the tree. Its sibling takes the parent's slot
    /// and size. The element itself stays in the arena, detached.
    #[instrument(skip(self))]
    pub fn remove_box_element(&mut self, element: NodeId) {
        if !self.tree.is_attached(element) || Some(element) == self.tree.root() {
            return;
        }
        self.set_maximized_internal(None);
        let Some(parent) = self.tree.parent(element) else { return };
        let Some(sibling) = self.tree.sibling(element) else { return };
        let Some(parent_bounds) = self.tree.bounds(parent) else { return };

        let relayout = match self.tree.parent(parent) {
            Some(grandparent) => {
                self.tree.replace_child(grandparent, parent, sibling);
                grandparent
            }
            None => {
                self.tree.set_root(Some(sibling));
                if let Some(node) = self.tree.node_mut(sibling) {
                    node.bounds.x = 0.0;
                    node.bounds.y = 0.0;
                }
                sibling
            }
        };
        self.tree.set_size(sibling, parent_bounds.size());

        if let Some(mut node) = self.tree.remove_node(parent) {
            if let NodeKind::Container(c) = &mut node.kind {
                c.separator.remove_from_parent();
            }
        }
        if let Some(node) = self.tree.node_mut(element) {
            node.parent = None;
        }
        self.detach_subtree(element);
        debug!(?element, "removed element");
        layout_subtree(&mut self.tree, relayout, &self.transform);
    }

    fn attach_subtree(&mut self, id: NodeId) {
        let host = self.host();
        let mut recommitted = Vec::new();
        for node in self.tree.preorder(id) {
            if let Some(c) = self.tree.container_mut(node) {
                c.separator.render(&host);
            } else if let Some(group) = self.tree.group_mut(node) {
                if group.attach(&host) {
                    recommitted.push(node);
                }
            }
        }
        for node in recommitted {
            self.focus_selected(node);
        }
    }

    fn detach_subtree(&mut self, id: NodeId) {
        for node in self.tree.preorder(id) {
            if let Some(c) = self.tree.container_mut(node) {
                c.separator.remove_from_parent();
            } else if let Some(group) = self.tree.group_mut(node) {
                group.detach();
            }
        }
    }

    /// Attaches the whole tree, as when the document hosting this layout is
    /// placed.
    pub(crate) fn attach_all(&mut self) {
        if let Some(root) = self.tree.root() {
            self.attach_subtree(root);
        }
    }

    pub(crate) fn detach_all(&mut self) {
        if let Some(root) = self.tree.root() {
            self.detach_subtree(root);
        }
    }

    /// Removes an element from the tree and frees it, unless it is the root.
    fn prune(&mut self, element: NodeId) {
        if Some(element) == self.tree.root() {
            return;
        }
        self.remove_box_element(element);
        if self.tree.parent(element).is_none() {
            self.tree.discard(element);
        }
    }

    fn prune_if_empty(&mut self, element: NodeId) {
        if self.tree.tab_group(element).is_some_and(|g| g.is_empty()) {
            self.prune(element);
        }
    }

    fn set_leaf_hold(&self, node: NodeId, hold: bool) {
        if let Some(group) = self.tree.group(node) {
            group.set_hold(hold);
        }
    }

    fn set_subtree_hold(&self, node: NodeId, hold: bool) {
        for leaf in self.tree.leaves(node) {
            self.set_leaf_hold(leaf, hold);
        }
    }

    // Maximize

    /// Gives one leaf the whole area, or restores the tree with `None`.
    pub fn set_maximized(&mut self, element: Option<NodeId>) {
        if let Some(e) = element {
            if self.tree.group(e).is_none() || !self.tree.is_attached(e) {
                warn!(?e, "only attached leaves can be maximized");
                return;
            }
        }
        self.set_maximized_internal(element);
        self.update_box_element();
    }

    pub fn toggle_maximize(&mut self, element: NodeId) {
        if self.maximized == Some(element) {
            self.set_maximized(None);
        } else {
            self.set_maximized(Some(element));
        }
    }

    fn set_maximized_internal(&mut self, element: Option<NodeId>) {
        if let Some(old) = self.maximized.take() {
            if let Some(group) = self.tree.group_mut(old) {
                group.set_maximized(false);
            }
            self.tree.set_size(old, self.cache_size);
        }
        self.maximized = element;
        if let Some(new) = element {
            if let Some(group) = self.tree.group_mut(new) {
                group.set_maximized(true);
            }
            self.cache_size = self.tree.bounds(new).map_or(Size::ZERO, |r| r.size());
        }
    }

    // Focus

    fn focus(&mut self, panel: Option<&PanelRef>) {
        let Some(transition) = focus_panel(&self.focus, panel) else {
            return;
        };
        if let Some(current) = transition.current {
            if current.owner().is_some_and(|o| o.layout == self.key) {
                self.emit(LayoutEvent::FocusChanged { panel: Some(current.id().to_string()) });
            }
        }
    }

    fn clear_focus(&mut self) {
        focus_panel(&self.focus, None);
        self.emit(LayoutEvent::FocusChanged { panel: None });
    }

    fn focus_selected(&mut self, element: NodeId) {
        if let Some(panel) = self.tree.tab_group(element).and_then(|g| g.selected_panel()) {
            self.focus(Some(&panel));
        }
    }

    /// The focused panel, if it belongs to this controller.
    pub fn active_panel(&self) -> Option<PanelRef> {
        self.focus
            .borrow()
            .current_focus()
            .filter(|p| p.owner().is_some_and(|o| o.layout == self.key))
    }

    /// The tab group that last held focus here, else the first leaf.
    pub fn active_tab_group(&self) -> Option<NodeId> {
        let active = self.focus.borrow().active_group(self.key);
        if let Some(node) = active {
            if self.tree.group(node).is_some() && self.tree.is_attached(node) {
                return Some(node);
            }
        }
        self.tree.first_leaf(self.tree.root()?)
    }

    // Panels

    pub fn register_panel(&mut self, panel: PanelRef) {
        self.registry.borrow_mut().insert(panel.id().to_string(), panel);
    }

    pub fn registered_panel(&self, id: &str) -> Option<PanelRef> {
        self.registry.borrow().get(id).cloned()
    }

    /// Tab group leaves in pre-order.
    pub fn all_tab_groups(&self) -> Vec<NodeId> {
        let Some(root) = self.tree.root() else {
            return Vec::new();
        };
        self.tree
            .leaves(root)
            .into_iter()
            .filter(|&id| self.tree.tab_group(id).is_some())
            .collect()
    }

    fn document_elements(&self) -> Vec<NodeId> {
        let Some(root) = self.tree.root() else {
            return Vec::new();
        };
        self.tree
            .leaves(root)
            .into_iter()
            .filter(|&id| self.tree.group(id).is_some_and(|g| g.is_document()))
            .collect()
    }

    /// The first document element, if any.
    pub fn document_element(&self) -> Option<NodeId> { self.document_elements().first().copied() }

    /// Panels of every tab group. Panels inside document layouts are not included.
    pub fn all_open_panels(&self) -> Vec<PanelRef> {
        self.tree.root().map(|r| self.tree.tab_panels_under(r)).unwrap_or_default()
    }

    /// Panels of every leaf, descending into document layouts.
    pub fn every_open_panel(&self) -> Vec<PanelRef> {
        self.tree.root().map(|r| self.panels_under(r)).unwrap_or_default()
    }

    fn panels_under(&self, node: NodeId) -> Vec<PanelRef> {
        self.tree
            .leaves(node)
            .into_iter()
            .filter_map(|leaf| self.tree.group(leaf))
            .flat_map(|g| g.open_panels())
            .collect()
    }

    pub fn is_panel_open(&self, id: &str) -> bool {
        self.all_open_panels().iter().any(|p| p.id() == id)
    }

    pub fn element_by_panel_id(&self, id: &str) -> Option<NodeId> {
        self.all_tab_groups()
            .into_iter()
            .find(|&leaf| self.tree.tab_group(leaf).is_some_and(|g| g.position_by_id(id).is_some()))
    }

    fn documents_holding(&self, id: &str) -> Vec<NodeId> {
        self.document_elements()
            .into_iter()
            .filter(|&doc| {
                self.document_layout(doc)
                    .is_some_and(|n| n.every_open_panel().iter().any(|p| p.id() == id))
            })
            .collect()
    }

    /// Whether `key` is this controller or one nested somewhere below it.
    fn reaches(&self, key: LayoutKey) -> bool {
        self.key == key || self.document_reaching(key).is_some()
    }

    /// The document leaf whose nested layouts include `key`.
    fn document_reaching(&self, key: LayoutKey) -> Option<NodeId> {
        self.document_elements()
            .into_iter()
            .find(|&doc| self.document_layout(doc).is_some_and(|n| n.reaches(key)))
    }

    /// Keeps a panel in one group: if it sits in another group of this
    /// controller or of a document layout below it, it is taken out silently
    /// first. A document element leaves panels of its own nested layout alone.
    fn release_from_other_group(&mut self, element: NodeId, panel: &PanelRef) {
        let Some(owner) = panel.owner() else { return };
        let same_slot = if owner.layout == self.key {
            owner.node == element
        } else {
            self.document_reaching(owner.layout) == Some(element)
        };
        if !same_slot {
            self.release_owner(owner, panel);
        }
    }

    fn release_owner(&mut self, owner: GroupLocation, panel: &PanelRef) {
        if owner.layout == self.key {
            if self.tree.tab_group(owner.node).is_some_and(|g| g.contains(panel)) {
                self.remove_panel_silent(owner.node, panel);
                self.prune_if_empty(owner.node);
            }
            return;
        }
        let Some(doc) = self.document_reaching(owner.layout) else { return };
        trace!(panel = panel.id(), ?doc, "releasing panel from document layout");
        if let Some(nested) = self.document_layout_mut(doc) {
            nested.release_owner(owner, panel);
        }
    }

    /// Adds and selects a panel, firing `PanelAdded` when it is new to the
    /// group. A document element forwards to its nested layout's active group.
    pub fn add_panel(&mut self, element: NodeId, panel: PanelRef) -> bool {
        self.add_panel_inner(element, panel, false)
    }

    pub fn add_panel_silent(&mut self, element: NodeId, panel: PanelRef) -> bool {
        self.add_panel_inner(element, panel, true)
    }

    fn add_panel_inner(&mut self, element: NodeId, panel: PanelRef, silent: bool) -> bool {
        let Some(is_document) = self.tree.group(element).map(|g| g.is_document()) else {
            return false;
        };
        self.release_from_other_group(element, &panel);
        if is_document {
            let Some(nested) = self.document_layout_mut(element) else { return false };
            let Some(target) = nested.active_tab_group() else { return false };
            return nested.add_panel_inner(target, panel, silent);
        }
        let Some(group) = self.tree.tab_group_mut(element) else { return false };
        let added = group.add_panel(panel.clone());
        if added && !silent {
            self.emit(LayoutEvent::PanelAdded { panel: panel.id().to_string(), element });
        }
        self.focus_selected(element);
        true
    }

    pub fn add_panel_to(
        &mut self,
        element: NodeId,
        anchor: &PanelRef,
        panel: PanelRef,
        placement: TabPlacement,
    ) -> bool {
        self.add_panel_to_inner(element, anchor, panel, placement, false)
    }

    pub fn add_panel_to_silent(
        &mut self,
        element: NodeId,
        anchor: &PanelRef,
        panel: PanelRef,
        placement: TabPlacement,
    ) -> bool {
        self.add_panel_to_inner(element, anchor, panel, placement, true)
    }

    fn add_panel_to_inner(
        &mut self,
        element: NodeId,
        anchor: &PanelRef,
        panel: PanelRef,
        placement: TabPlacement,
        silent: bool,
    ) -> bool {
        if self.tree.tab_group(element).is_none() {
            return false;
        }
        self.release_from_other_group(element, &panel);
        let Some(group) = self.tree.tab_group_mut(element) else { return false };
        if !group.add_panel_to(anchor, panel.clone(), placement) {
            return false;
        }
        if !silent {
            self.emit(LayoutEvent::PanelAdded { panel: panel.id().to_string(), element });
        }
        self.focus_selected(element);
        true
    }

    /// Removes a panel after observers agree, remembering where it was so it
    /// can reopen in place. Returns false if it was not there or was kept.
    pub fn remove_panel(&mut self, element: NodeId, panel: &PanelRef) -> bool {
        if !self.tree.tab_group(element).is_some_and(|g| g.contains(panel)) {
            return false;
        }
        if !self.allow_removal(panel, element) {
            debug!(panel = panel.id(), "removal vetoed");
            return false;
        }
        let link = self.tree.dir_link(element);
        self.closed_links.insert(panel.id().to_string(), link);
        if let Some(group) = self.tree.tab_group_mut(element) {
            group.remove_panel(panel);
        }
        self.emit(LayoutEvent::PanelRemoved { panel: panel.id().to_string(), element });
        if self.all_open_panels().is_empty() {
            self.clear_focus();
        }
        self.focus_selected(element);
        true
    }

    pub fn remove_panel_silent(&mut self, element: NodeId, panel: &PanelRef) -> bool {
        let removed = self
            .tree
            .tab_group_mut(element)
            .is_some_and(|group| group.remove_panel(panel));
        if removed {
            self.focus_selected(element);
        }
        removed
    }

    pub fn select_panel(&mut self, element: NodeId, index: usize) {
        let Some(group) = self.tree.tab_group_mut(element) else { return };
        if index >= group.len() {
            return;
        }
        group.select(Some(index));
        self.focus_selected(element);
    }

    /// Opens a registered panel. Already open panels are just selected, even
    /// inside a document layout. With
    /// `old_space`, a panel closed earlier goes back where it was when that
    /// spot can still be found.
    #[instrument(skip(self))]
    pub fn open_panel_by_id(&mut self, id: &str, old_space: bool) -> Result<(), LayoutError> {
        let panel = self
            .registered_panel(id)
            .ok_or_else(|| LayoutError::PanelNotRegistered(id.to_string()))?;
        if self.tree.root().is_none() {
            let element = self.create_element();
            self.add_box_element_to_root(element, Side::Right);
        }
        for leaf in self.all_tab_groups() {
            if let Some(index) = self.tree.tab_group(leaf).and_then(|g| g.position_by_id(id)) {
                self.select_panel(leaf, index);
                return Ok(());
            }
        }
        if let Some(doc) = self.documents_holding(id).first().copied() {
            if let Some(nested) = self.document_layout_mut(doc) {
                return nested.open_panel_by_id(id, false);
            }
        }
        if old_space {
            if let Some(element) = self.old_space(id) {
                self.set_leaf_hold(element, true);
                self.add_panel(element, panel.clone());
                self.set_leaf_hold(element, false);
                if self.maximized.is_some() && self.maximized != Some(element) {
                    self.set_maximized(None);
                }
                return Ok(());
            }
        }
        if let Some(target) = self.active_tab_group() {
            self.set_leaf_hold(target, true);
            self.add_panel(target, panel.clone());
            self.set_leaf_hold(target, false);
            panel.set_hold(false);
        }
        Ok(())
    }

    fn old_space(&mut self, id: &str) -> Option<NodeId> {
        let mut link = self.closed_links.get(id)?.clone();
        if let Some(node) = self.tree.element_by_link(&link) {
            match self.tree.group(node) {
                Some(Group::Tabs(_)) => return Some(node),
                Some(Group::Document(_)) => {}
                None => return None,
            }
        }
        let side = link.pop()?;
        let anchor = match self.tree.element_by_link(&link) {
            Some(node) => node,
            None if link.is_empty() => self.tree.root()?,
            None => return None,
        };
        let element = self.create_element();
        self.add_box_element(anchor, element, side);
        if !self.tree.is_attached(element) {
            self.tree.discard(element);
            return None;
        }
        Some(element)
    }

    /// Closes a registered panel wherever it is open, document layouts
    /// included. Groups left empty are pruned.
    #[instrument(skip(self))]
    pub fn close_panel_by_id(&mut self, id: &str) -> Result<(), LayoutError> {
        if self.registered_panel(id).is_none() {
            return Err(LayoutError::PanelNotRegistered(id.to_string()));
        }
        for leaf in self.all_tab_groups() {
            let Some(target) = self
                .tree
                .tab_group(leaf)
                .and_then(|g| g.position_by_id(id).map(|i| g.panels()[i].clone()))
            else {
                continue;
            };
            self.set_leaf_hold(leaf, true);
            target.set_hold(false);
            self.remove_panel(leaf, &target);
            self.set_leaf_hold(leaf, false);
            self.prune_if_empty(leaf);
        }
        for doc in self.documents_holding(id) {
            if let Some(nested) = self.document_layout_mut(doc) {
                nested.close_panel_by_id(id)?;
            }
        }
        Ok(())
    }

    pub fn tab_menu_action(&mut self, element: NodeId, action: TabMenuAction) {
        let Some(group) = self.tree.tab_group(element) else { return };
        match action {
            TabMenuAction::Close => {
                let Some(panel) = group.selected_panel() else { return };
                self.set_leaf_hold(element, true);
                panel.set_hold(false);
                self.remove_panel(element, &panel);
                self.set_leaf_hold(element, false);
            }
            TabMenuAction::CloseAll => {
                let panels = group.panels().to_vec();
                for panel in panels.iter().rev() {
                    self.remove_panel(element, panel);
                }
            }
        }
        self.prune_if_empty(element);
    }

    // Drag and dock

    /// Starts dragging `panel` out of `element`. Refused while maximized.
    pub fn start_drag(&mut self, element: NodeId, panel: &PanelRef) -> bool {
        if self.maximized.is_some() {
            return false;
        }
        if !self.tree.tab_group(element).is_some_and(|g| g.contains(panel)) {
            return false;
        }
        let Some(root_bounds) = self.tree.root().and_then(|r| self.tree.bounds(r)) else {
            return false;
        };
        let host = self.host();
        self.mask.show(&host, root_bounds, None);
        self.gesture = Gesture::Dragging(DragInfo::new(DragSource { element, panel: panel.clone() }));
        debug!(panel = panel.id(), "drag started");
        true
    }

    pub fn is_dragging(&self) -> bool { matches!(self.gesture, Gesture::Dragging(_)) }

    /// The current drop proposal of an in-progress drag.
    pub fn drag_proposal(&self) -> Option<&DropProposal> {
        match &self.gesture {
            Gesture::Dragging(info) => info.proposal.as_ref(),
            _ => None,
        }
    }

    pub fn drag_ghost(&self) -> Option<Rect> {
        self.ghost.is_visible().then(|| self.ghost.frame())
    }

    /// Chrome the host should paint: attached separators, then the mask and
    /// ghost while a drag is running.
    pub fn overlays(&self) -> Vec<&Overlay> {
        let mut out = Vec::new();
        if let Some(root) = self.tree.root() {
            for node in self.tree.preorder(root) {
                if let Some(c) = self.tree.container(node) {
                    if c.separator.is_visible() {
                        out.push(&c.separator);
                    }
                }
            }
        }
        out.extend([&self.mask, &self.ghost].into_iter().filter(|o| o.is_visible()));
        out
    }

    fn drag_move(&mut self, local: Point) {
        let host = self.host();
        let Gesture::Dragging(info) = &mut self.gesture else { return };
        info.proposal = None;
        let target = self.tree.root().and_then(|root| {
            self.tree
                .leaves(root)
                .into_iter()
                .find(|&leaf| self.tree.bounds(leaf).is_some_and(|r| r.contains(local)))
        });
        if let Some(group) = target.and_then(|t| self.tree.group(t)) {
            if !group.adjust_drag_info(local, info) {
                info.proposal = None;
            }
        }
        match &info.proposal {
            Some(proposal) => self.ghost.show(&host, info.range, Some(proposal.feedback())),
            None => self.ghost.hide(),
        }
    }

    fn drag_finish(&mut self, info: DragInfo) -> DragOutcome {
        self.ghost.hide();
        self.mask.hide();
        let panel = info.source.panel.id().to_string();
        match info.proposal {
            Some(proposal) => {
                self.accept_drop(info.source, proposal);
                DragOutcome::Resolved { panel }
            }
            None => {
                debug!(%panel, "drag cancelled");
                DragOutcome::Cancelled { panel }
            }
        }
    }

    fn accept_drop(&mut self, source: DragSource, proposal: DropProposal) {
        let DragSource { element: start, panel } = source;
        let target = proposal.target();
        if !self.tree.is_attached(start) || !self.tree.is_attached(target) {
            return;
        }
        let mut held: Vec<PanelRef> = Vec::new();
        for node in [start, target] {
            if let Some(group) = self.tree.group(node) {
                held.extend(group.open_panels());
            }
        }
        for p in &held {
            p.set_hold(true);
        }

        let moved = match proposal {
            DropProposal::Merge { target } => {
                if start == target {
                    false
                } else {
                    self.remove_panel_silent(start, &panel);
                    self.prune_if_empty(start);
                    self.add_panel_silent(target, panel.clone())
                }
            }
            DropProposal::Split { target, side } => {
                let alone = self.tree.tab_group(start).is_some_and(|g| g.len() == 1);
                if start == target && alone {
                    false
                } else {
                    self.remove_panel_silent(start, &panel);
                    self.prune_if_empty(start);
                    let element = self.create_element();
                    self.add_box_element(target, element, side);
                    self.add_panel_silent(element, panel.clone())
                }
            }
            DropProposal::InsertTab { target, anchor, placement } => {
                if start != target {
                    self.remove_panel_silent(start, &panel);
                    self.prune_if_empty(start);
                }
                self.add_panel_to_silent(target, &anchor, panel.clone(), placement)
            }
        };

        for p in &held {
            p.set_hold(false);
        }
        if moved {
            self.emit(LayoutEvent::PanelDrag { panel: panel.id().to_string() });
        }
    }

    // Pointer input

    fn leaf_at(&self, local: Point) -> Option<NodeId> {
        let candidates = match self.maximized {
            Some(max) => vec![max],
            None => self.tree.root().map(|r| self.tree.leaves(r)).unwrap_or_default(),
        };
        candidates
            .into_iter()
            .find(|&leaf| self.tree.bounds(leaf).is_some_and(|r| r.contains(local)))
    }

    fn separator_at(&self, local: Point) -> Option<NodeId> {
        if self.maximized.is_some() {
            return None;
        }
        let root = self.tree.root()?;
        self.tree.preorder(root).into_iter().find(|&node| {
            self.tree
                .container(node)
                .is_some_and(|c| c.separator.is_visible() && c.separator.frame().contains(local))
        })
    }

    fn separator_cursor(&self, container: NodeId) -> CursorStyle {
        match self.tree.container(container).map(|c| c.orientation) {
            Some(Orientation::Vertical) => CursorStyle::RowResize,
            _ => CursorStyle::ColResize,
        }
    }

    fn forward(&mut self, element: NodeId, event: PointerEvent) -> EventResponse {
        match self.document_layout_mut(element) {
            Some(nested) => nested.handle_pointer(event),
            None => EventResponse::ignored(),
        }
    }

    /// Feeds one pointer event in host coordinates through the gesture state
    /// machine.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> EventResponse {
        let local = self.global_to_local(event.position);
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match (gesture, event.kind) {
            (Gesture::Forwarded(element), kind) => {
                let response = self.forward(element, event);
                if kind != PointerKind::Up && response.capture_pointer {
                    self.gesture = Gesture::Forwarded(element);
                }
                response
            }
            (Gesture::Separator(drag), PointerKind::Move) => {
                drag.update(&mut self.tree, local, &self.transform);
                let cursor = self.separator_cursor(drag.container());
                self.gesture = Gesture::Separator(drag);
                EventResponse {
                    handled: true,
                    capture_pointer: true,
                    cursor: Some(cursor),
                    ..EventResponse::default()
                }
            }
            (Gesture::Separator(_), PointerKind::Up) => EventResponse {
                handled: true,
                cursor: Some(CursorStyle::Default),
                ..EventResponse::default()
            },
            (Gesture::TabPress { element, index, start }, PointerKind::Move) => {
                let threshold = self.config.settings.drag_threshold;
                let moved = (event.position.x - start.x).abs() > threshold
                    || (event.position.y - start.y).abs() > threshold;
                if !moved {
                    self.gesture = Gesture::TabPress { element, index, start };
                    return EventResponse { handled: true, capture_pointer: true, ..Default::default() };
                }
                let panel = self.tree.tab_group(element).and_then(|g| g.panels().get(index).cloned());
                match panel {
                    Some(panel) if self.start_drag(element, &panel) => {
                        self.drag_move(local);
                        EventResponse { handled: true, capture_pointer: true, ..Default::default() }
                    }
                    _ => EventResponse::handled(),
                }
            }
            (Gesture::TabPress { element, index, .. }, PointerKind::Up) => {
                self.select_panel(element, index);
                EventResponse::handled()
            }
            (Gesture::Dragging(info), PointerKind::Move) => {
                self.gesture = Gesture::Dragging(info);
                self.drag_move(local);
                EventResponse { handled: true, capture_pointer: true, ..Default::default() }
            }
            (Gesture::Dragging(info), PointerKind::Up) => {
                self.gesture = Gesture::Dragging(info);
                self.drag_move(local);
                let Gesture::Dragging(info) = std::mem::replace(&mut self.gesture, Gesture::Idle)
                else {
                    return EventResponse::handled();
                };
                let outcome = self.drag_finish(info);
                EventResponse { handled: true, drag: Some(outcome), ..Default::default() }
            }
            (Gesture::Idle, PointerKind::Down) => self.pointer_down(local, event),
            (Gesture::Idle, PointerKind::Move) => self.hover(local, event),
            (Gesture::Idle, PointerKind::DoubleClick) => self.double_click(local, event),
            (Gesture::Idle, PointerKind::Up) => EventResponse::ignored(),
            (gesture, _) => {
                self.gesture = gesture;
                EventResponse { handled: true, capture_pointer: true, ..Default::default() }
            }
        }
    }

    fn pointer_down(&mut self, local: Point, event: PointerEvent) -> EventResponse {
        if let Some(container) = self.separator_at(local) {
            if let Some(drag) = SeparatorDrag::begin(&self.tree, container, local) {
                let cursor = self.separator_cursor(container);
                self.gesture = Gesture::Separator(drag);
                return EventResponse {
                    handled: true,
                    capture_pointer: true,
                    cursor: Some(cursor),
                    ..EventResponse::default()
                };
            }
        }
        let Some(leaf) = self.leaf_at(local) else {
            return EventResponse::ignored();
        };
        if self.tree.group(leaf).is_some_and(|g| g.is_document()) {
            let response = self.forward(leaf, event);
            if response.capture_pointer {
                self.gesture = Gesture::Forwarded(leaf);
            }
            return response;
        }
        let Some(tabs) = self.tree.tab_group(leaf) else {
            return EventResponse::ignored();
        };
        let bar = tabs.tab_bar();
        if bar.menu_button_bounds().is_some_and(|r| r.contains(local)) {
            return EventResponse { handled: true, open_menu: Some(leaf), ..Default::default() };
        }
        if let Some(index) = bar.item_at(local) {
            self.gesture = Gesture::TabPress { element: leaf, index, start: event.position };
            return EventResponse { handled: true, capture_pointer: true, ..Default::default() };
        }
        self.focus_selected(leaf);
        EventResponse::handled()
    }

    fn hover(&mut self, local: Point, event: PointerEvent) -> EventResponse {
        if let Some(container) = self.separator_at(local) {
            return EventResponse {
                cursor: Some(self.separator_cursor(container)),
                ..EventResponse::default()
            };
        }
        if let Some(leaf) = self.leaf_at(local) {
            if self.tree.group(leaf).is_some_and(|g| g.is_document()) {
                return self.forward(leaf, event);
            }
        }
        EventResponse { cursor: Some(CursorStyle::Default), ..EventResponse::default() }
    }

    fn double_click(&mut self, local: Point, event: PointerEvent) -> EventResponse {
        let Some(leaf) = self.leaf_at(local) else {
            return EventResponse::ignored();
        };
        if self.tree.group(leaf).is_some_and(|g| g.is_document()) {
            return self.forward(leaf, event);
        }
        let on_tab = self
            .tree
            .tab_group(leaf)
            .is_some_and(|tabs| tabs.tab_bar().item_at(local).is_some());
        if !on_tab {
            return EventResponse::ignored();
        }
        self.toggle_maximize(leaf);
        EventResponse::handled()
    }

    // Serialization

    pub fn get_layout_config(&self) -> Option<LayoutNodeConfig> {
        self.layout_config_with(&*self.config.panel_serializer)
    }

    pub fn layout_config_with(&self, serializer: &dyn PanelSerializer) -> Option<LayoutNodeConfig> {
        self.node_config(self.tree.root()?, serializer)
    }

    fn node_config(&self, id: NodeId, serializer: &dyn PanelSerializer) -> Option<LayoutNodeConfig> {
        let node = self.tree.node(id)?;
        let bounds = node.bounds();
        Some(match node.kind() {
            NodeKind::Container(c) => LayoutNodeConfig::Container {
                bounds,
                is_vertical: c.orientation.is_vertical(),
                first_element: Box::new(self.node_config(c.first, serializer)?),
                second_element: Box::new(self.node_config(c.second, serializer)?),
            },
            NodeKind::Leaf(Group::Tabs(group)) => LayoutNodeConfig::Element {
                bounds,
                render: GroupConfig {
                    selected_index: group.selected_index(),
                    panels: group.panels().iter().map(|p| serializer.serialize(self, p)).collect(),
                },
            },
            NodeKind::Leaf(Group::Document(doc)) => LayoutNodeConfig::DocumentElement {
                bounds,
                layout_info: doc
                    .layout()
                    .layout_config_with(&*self.config.document_panel_serializer)
                    .map(Box::new),
            },
        })
    }

    /// Replaces the whole tree with `config`.
    ///
    /// Ids the serializer cannot resolve become placeholders, which are dropped
    /// once the new tree is in place. Panels open both before and after are held
    /// so their surfaces survive the swap.
    #[instrument(skip_all)]
    pub fn apply_layout_config(&mut self, config: &LayoutNodeConfig) {
        self.focus.borrow_mut().reset();
        let mut placeholders = Vec::new();
        let root = self.build_node(config, &mut placeholders);

        let incoming = self.panels_under(root);
        let outgoing = self.every_open_panel();
        let kept: Vec<PanelRef> = incoming
            .into_iter()
            .filter(|p| outgoing.iter().any(|o| Rc::ptr_eq(o, p)))
            .collect();
        for panel in &kept {
            panel.set_hold(true);
        }

        if let Some(old) = self.tree.root() {
            self.set_maximized_internal(None);
            self.detach_subtree(old);
            self.tree.set_root(None);
            self.tree.discard(old);
        }
        self.add_box_element_to_root(root, Side::Right);

        for panel in &kept {
            panel.set_hold(false);
        }

        let purged = placeholders.len();
        for placeholder in placeholders {
            let Some(owner) = placeholder.owner() else { continue };
            if owner.layout != self.key {
                continue;
            }
            self.remove_panel_silent(owner.node, &placeholder);
            self.prune_if_empty(owner.node);
        }
        debug!(kept = kept.len(), purged, "applied layout config");
    }

    fn build_node(&mut self, config: &LayoutNodeConfig, placeholders: &mut Vec<PanelRef>) -> NodeId {
        let id = match config {
            LayoutNodeConfig::Container { is_vertical, first_element, second_element, .. } => {
                let first = self.build_node(first_element, placeholders);
                let second = self.build_node(second_element, placeholders);
                let settings = &self.config.settings;
                let (gap, separator) = (settings.gap, settings.separator_size);
                let orientation = Orientation::from_vertical(*is_vertical);
                self.tree.insert_container(first, second, orientation, gap, separator)
            }
            LayoutNodeConfig::Element { render, .. } => {
                let id = self.create_element();
                let serializer = self.config.panel_serializer.clone();
                let mut panels = Vec::with_capacity(render.panels.len());
                for entry in &render.panels {
                    let panel = serializer.unserialize(self, entry).unwrap_or_else(|| {
                        warn!(%entry, "unresolved panel, using placeholder");
                        let placeholder = Panel::placeholder();
                        placeholders.push(placeholder.clone());
                        placeholder
                    });
                    panels.push(panel);
                }
                let last = panels.len().checked_sub(1);
                let selected = match (render.selected_index, last) {
                    (Some(i), Some(last)) if i > last => {
                        warn!(index = i, last, "selected index out of range, clamping");
                        Some(last)
                    }
                    (Some(i), Some(_)) => Some(i),
                    (None, last) => last,
                    (_, None) => None,
                };
                if let Some(group) = self.tree.tab_group_mut(id) {
                    group.set_panels(panels, selected);
                }
                id
            }
            LayoutNodeConfig::DocumentElement { layout_info, .. } => {
                let id = self.create_document_element();
                if let (Some(info), Some(nested)) = (layout_info, self.document_layout_mut(id)) {
                    nested.apply_layout_config(info);
                }
                id
            }
        };
        let bounds = config.bounds();
        if let Some(node) = self.tree.node_mut(id) {
            node.bounds = bounds;
            node.explicit = bounds.size();
        }
        id
    }

    // Debugging

    pub fn draw_tree(&self) -> String {
        let Some(root) = self.tree.root() else {
            return "<empty layout>".to_string();
        };
        let tree = self.get_ascii_tree(root);
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &tree).is_err() {
            warn!("failed to render layout tree");
        }
        out
    }

    fn get_ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let bounds = self.tree.bounds(node).unwrap_or_default();
        let at = format!("{:.0}x{:.0}+{:.0}+{:.0}", bounds.w, bounds.h, bounds.x, bounds.y);
        let max = if self.maximized == Some(node) { " (maximized)" } else { "" };
        match self.tree.node(node).map(|n| n.kind()) {
            Some(NodeKind::Container(c)) => ascii_tree::Tree::Node(
                format!("Container {} {at}", c.orientation),
                vec![self.get_ascii_tree(c.first), self.get_ascii_tree(c.second)],
            ),
            Some(NodeKind::Leaf(Group::Tabs(group))) => {
                let tabs: Vec<String> = group
                    .panels()
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let mark = if Some(i) == group.selected_index() { "*" } else { "" };
                        format!("{mark}{}", p.id())
                    })
                    .collect();
                ascii_tree::Tree::Leaf(vec![format!("Element [{}] {at}{max}", tabs.join(", "))])
            }
            Some(NodeKind::Leaf(Group::Document(doc))) => {
                let nested = match doc.layout().tree.root() {
                    Some(root) => doc.layout().get_ascii_tree(root),
                    None => ascii_tree::Tree::Leaf(vec!["<empty layout>".to_string()]),
                };
                ascii_tree::Tree::Node(format!("DocumentElement {at}{max}"), vec![nested])
            }
            None => ascii_tree::Tree::Leaf(vec![format!("{node:?} <missing>")]),
        }
    }
}

impl Drop for BoxLayout {
    fn drop(&mut self) {
        if let Ok(mut focus) = self.focus.try_borrow_mut() {
            focus.unregister_layout(self.key);
        }
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::model::focus::FocusManager;
    use crate::ui::surface::testing::{RecordingSurface, SurfaceCall, SurfaceLog, count};

    fn layout() -> BoxLayout {
        let mut layout = BoxLayout::new(FocusManager::new_context());
        layout.set_area(Size::new(800.0, 600.0), Matrix::IDENTITY);
        layout
    }

    fn register(layout: &mut BoxLayout, id: &str) -> PanelRef {
        let panel = Panel::new(id, id);
        layout.register_panel(panel.clone());
        panel
    }

    fn ids(layout: &BoxLayout, element: NodeId) -> Vec<String> {
        layout
            .tab_group(element)
            .unwrap()
            .panels()
            .iter()
            .map(|p| p.id().to_string())
            .collect()
    }

    /// `E0{p1}` on the left, `E1{p2}` docked to its right.
    fn two_columns() -> (BoxLayout, NodeId, NodeId) {
        let mut layout = layout();
        register(&mut layout, "p1");
        let p2 = register(&mut layout, "p2");
        layout.open_panel_by_id("p1", false).unwrap();
        let e0 = layout.root().unwrap();
        let e1 = layout.create_element();
        layout.add_box_element(e0, e1, Side::Right);
        layout.add_panel(e1, p2);
        (layout, e0, e1)
    }

    #[test]
    fn docking_splits_the_target_slot() {
        let (layout, e0, e1) = two_columns();
        let root = layout.root().unwrap();

        assert_eq!(layout.tree().children(root), Some((e0, e1)));
        assert_eq!(layout.tree().container(root).unwrap().orientation, Orientation::Horizontal);
        assert_eq!(layout.node_bounds(e0), Some(Rect::new(0.0, 0.0, 400.0, 600.0)));
        assert_eq!(layout.node_bounds(e1), Some(Rect::new(401.0, 0.0, 399.0, 600.0)));
        assert_eq!(layout.tab_group(e1).unwrap().tab_bar().bounds(), Rect::new(401.0, 0.0, 399.0, 25.0));
    }

    #[test]
    fn docking_then_closing_restores_shape_and_bounds() {
        let (mut layout, e0, e1) = two_columns();
        let root = layout.root().unwrap();
        let before: Vec<_> = [root, e0, e1].iter().map(|&n| layout.node_bounds(n)).collect();

        let p3 = register(&mut layout, "p3");
        let e2 = layout.create_element();
        layout.add_box_element(e1, e2, Side::Bottom);
        layout.add_panel(e2, p3);
        let (top, bottom) = layout.tree().children(layout.tree().parent(e2).unwrap()).unwrap();
        assert_eq!((top, bottom), (e1, e2));
        assert_eq!(layout.node_bounds(e1).unwrap().h + 1.0 + layout.node_bounds(e2).unwrap().h, 600.0);

        layout.close_panel_by_id("p3").unwrap();
        assert_eq!(layout.root(), Some(root));
        assert_eq!(layout.tree().children(root), Some((e0, e1)));
        let after: Vec<_> = [root, e0, e1].iter().map(|&n| layout.node_bounds(n)).collect();
        assert_eq!(after, before);
    }

    #[test]
    fn dragging_into_a_center_zone_merges_and_collapses() {
        let (mut layout, e0, e1) = two_columns();

        layout.handle_pointer(PointerEvent::down(10.0, 10.0));
        let response = layout.handle_pointer(PointerEvent::moved(600.0, 300.0));
        assert!(response.capture_pointer);
        assert!(matches!(layout.drag_proposal(), Some(DropProposal::Merge { target }) if *target == e1));
        assert!(layout.drag_ghost().is_some());

        let response = layout.handle_pointer(PointerEvent::up(600.0, 300.0));
        assert_eq!(response.drag, Some(DragOutcome::Resolved { panel: "p1".into() }));

        assert_eq!(layout.root(), Some(e1));
        assert!(!layout.tree().contains(e0));
        assert_eq!(ids(&layout, e1), vec!["p2", "p1"]);
        assert_eq!(layout.tab_group(e1).unwrap().selected_index(), Some(1));
        assert_eq!(layout.node_bounds(e1), Some(Rect::new(0.0, 0.0, 800.0, 600.0)));
        assert!(layout.drag_ghost().is_none());
        assert!(layout.take_events().contains(&LayoutEvent::PanelDrag { panel: "p1".into() }));
    }

    #[test]
    fn dragging_onto_an_edge_splits_into_a_new_element() {
        let (mut layout, e0, e1) = two_columns();
        let p3 = register(&mut layout, "p3");
        layout.add_panel(e1, p3);

        // p3 is the second tab of E1.
        layout.handle_pointer(PointerEvent::down(550.0, 10.0));
        layout.handle_pointer(PointerEvent::moved(20.0, 300.0));
        assert!(matches!(
            layout.drag_proposal(),
            Some(DropProposal::Split { target, side: Side::Left }) if *target == e0
        ));
        layout.handle_pointer(PointerEvent::up(20.0, 300.0));

        let root = layout.root().unwrap();
        let (left, right) = layout.tree().children(root).unwrap();
        assert_eq!(right, e1);
        let (e2, second) = layout.tree().children(left).unwrap();
        assert_eq!(second, e0);
        assert_eq!(ids(&layout, e2), vec!["p3"]);
        assert_eq!(ids(&layout, e1), vec!["p2"]);

        let (a, b) = (layout.node_bounds(e2).unwrap(), layout.node_bounds(e0).unwrap());
        assert_eq!(a.w + 1.0 + b.w, layout.node_bounds(left).unwrap().w);
        assert_eq!(layout.node_bounds(left).unwrap().w, 400.0);
    }

    #[test]
    fn releasing_outside_every_element_cancels() {
        let (mut layout, e0, e1) = two_columns();

        layout.handle_pointer(PointerEvent::down(10.0, 10.0));
        layout.handle_pointer(PointerEvent::moved(600.0, 300.0));
        layout.handle_pointer(PointerEvent::moved(900.0, 700.0));
        assert!(layout.drag_proposal().is_none());
        let response = layout.handle_pointer(PointerEvent::up(900.0, 700.0));

        assert_eq!(response.drag, Some(DragOutcome::Cancelled { panel: "p1".into() }));
        assert_eq!(ids(&layout, e0), vec!["p1"]);
        assert_eq!(ids(&layout, e1), vec!["p2"]);
        assert!(!layout.is_dragging());
    }

    #[test]
    fn a_short_press_selects_instead_of_dragging() {
        let (mut layout, _e0, e1) = two_columns();
        let p3 = register(&mut layout, "p3");
        layout.add_panel(e1, p3);
        assert_eq!(layout.tab_group(e1).unwrap().selected_index(), Some(1));

        layout.handle_pointer(PointerEvent::down(420.0, 10.0));
        layout.handle_pointer(PointerEvent::moved(422.0, 11.0));
        assert!(!layout.is_dragging());
        layout.handle_pointer(PointerEvent::up(422.0, 11.0));

        assert_eq!(layout.tab_group(e1).unwrap().selected_index(), Some(0));
        assert_eq!(layout.active_panel().map(|p| p.id().to_string()), Some("p2".into()));
    }

    #[test]
    fn separator_drag_resizes_both_sides() {
        let (mut layout, e0, e1) = two_columns();

        let response = layout.handle_pointer(PointerEvent::down(400.0, 300.0));
        assert_eq!(response.cursor, Some(CursorStyle::ColResize));
        layout.handle_pointer(PointerEvent::moved(500.0, 300.0));
        layout.handle_pointer(PointerEvent::up(500.0, 300.0));

        assert_eq!(layout.node_bounds(e0).unwrap().w, 500.0);
        assert_eq!(layout.node_bounds(e1), Some(Rect::new(501.0, 0.0, 299.0, 600.0)));
    }

    #[test]
    fn unmaximize_restores_the_cached_size() {
        let (mut layout, _e0, e1) = two_columns();
        let before = layout.node_bounds(e1).unwrap().size();

        layout.set_maximized(Some(e1));
        assert_eq!(layout.maximized(), Some(e1));
        assert_eq!(layout.node_bounds(e1), Some(Rect::new(0.0, 0.0, 800.0, 600.0)));
        assert!(layout.tab_group(e1).unwrap().is_maximized());
        let p2 = layout.registered_panel("p2").unwrap();
        assert!(!layout.start_drag(e1, &p2));

        layout.set_maximized(None);
        assert_eq!(layout.node_bounds(e1).unwrap().size(), before);
        assert!(!layout.tab_group(e1).unwrap().is_maximized());
    }

    #[test]
    fn double_click_on_a_tab_toggles_maximize() {
        let (mut layout, _e0, e1) = two_columns();
        layout.handle_pointer(PointerEvent::double_click(420.0, 10.0));
        assert_eq!(layout.maximized(), Some(e1));
        layout.handle_pointer(PointerEvent::double_click(20.0, 10.0));
        assert_eq!(layout.maximized(), None);
    }

    #[test]
    fn closing_the_last_panel_prunes_the_element() {
        let (mut layout, e0, e1) = two_columns();
        layout.close_panel_by_id("p2").unwrap();

        assert_eq!(layout.root(), Some(e0));
        assert!(!layout.tree().contains(e1));
        assert_eq!(layout.node_bounds(e0), Some(Rect::new(0.0, 0.0, 800.0, 600.0)));
        assert!(!layout.is_panel_open("p2"));
        assert_eq!(layout.registered_panel("p2").unwrap().owner(), None);

        layout.close_panel_by_id("p1").unwrap();
        assert_eq!(layout.root(), Some(e0));
        assert!(layout.all_open_panels().is_empty());
        assert!(layout.take_events().contains(&LayoutEvent::FocusChanged { panel: None }));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut layout = layout();
        assert!(matches!(
            layout.open_panel_by_id("nope", false),
            Err(LayoutError::PanelNotRegistered(id)) if id == "nope"
        ));
        assert!(layout.close_panel_by_id("nope").is_err());
    }

    #[test]
    fn reopening_goes_back_to_the_old_space() {
        let (mut layout, e0, e1) = two_columns();
        let p3 = register(&mut layout, "p3");
        layout.add_panel(e1, p3);

        layout.close_panel_by_id("p3").unwrap();
        layout.open_panel_by_id("p3", true).unwrap();
        assert_eq!(ids(&layout, e1), vec!["p2", "p3"]);

        layout.close_panel_by_id("p2").unwrap();
        layout.close_panel_by_id("p3").unwrap();
        assert_eq!(layout.root(), Some(e0));

        layout.open_panel_by_id("p3", true).unwrap();
        let root = layout.root().unwrap();
        let (first, second) = layout.tree().children(root).unwrap();
        assert_eq!(first, e0);
        assert_eq!(ids(&layout, second), vec!["p3"]);
    }

    #[test]
    fn opening_an_open_panel_only_selects_it() {
        let (mut layout, e0, _e1) = two_columns();
        let p3 = register(&mut layout, "p3");
        layout.add_panel(e0, p3);
        layout.open_panel_by_id("p1", false).unwrap();

        assert_eq!(ids(&layout, e0), vec!["p1", "p3"]);
        assert_eq!(layout.tab_group(e0).unwrap().selected_index(), Some(0));
        assert_eq!(layout.active_tab_group(), Some(e0));
    }

    #[test]
    fn a_panel_lives_in_one_group() {
        let (mut layout, e0, e1) = two_columns();
        let p1 = layout.registered_panel("p1").unwrap();
        layout.add_panel(e1, p1);

        assert_eq!(ids(&layout, e1), vec!["p2", "p1"]);
        assert!(!layout.tree().contains(e0));
    }

    #[test]
    fn observers_can_veto_removal() {
        struct Keep;
        impl LayoutObserver for Keep {
            fn panel_removing(&mut self, panel: &PanelRef, _element: NodeId) -> bool {
                panel.id() != "p1"
            }
        }

        let (mut layout, e0, _e1) = two_columns();
        layout.add_observer(Box::new(Keep));
        let p1 = layout.registered_panel("p1").unwrap();
        assert!(!layout.remove_panel(e0, &p1));
        assert_eq!(ids(&layout, e0), vec!["p1"]);
    }

    #[test]
    fn tab_menu_close_actions() {
        let (mut layout, e0, e1) = two_columns();
        let p3 = register(&mut layout, "p3");
        layout.add_panel(e1, p3);

        layout.tab_menu_action(e1, TabMenuAction::Close);
        assert_eq!(ids(&layout, e1), vec!["p2"]);

        layout.tab_menu_action(e1, TabMenuAction::CloseAll);
        assert!(!layout.tree().contains(e1));
        assert_eq!(layout.root(), Some(e0));
    }

    #[test]
    fn focus_changes_are_reported() {
        let mut layout = layout();
        register(&mut layout, "p1");
        layout.open_panel_by_id("p1", false).unwrap();
        let root = layout.root().unwrap();

        let events = layout.take_events();
        assert!(events.contains(&LayoutEvent::PanelAdded { panel: "p1".into(), element: root }));
        assert!(events.contains(&LayoutEvent::FocusChanged { panel: Some("p1".into()) }));
        assert!(layout.registered_panel("p1").unwrap().is_focused());
    }

    #[test]
    fn layout_config_round_trips_through_json() {
        let (layout, _e0, _e1) = two_columns();
        let config = layout.get_layout_config().unwrap();
        let json = config.to_json_string().unwrap();

        let mut restored = self::layout();
        register(&mut restored, "p1");
        register(&mut restored, "p2");
        restored.apply_layout_config(&LayoutNodeConfig::from_json_str(&json).unwrap());

        assert_eq!(restored.get_layout_config(), Some(config));
        let root = restored.root().unwrap();
        let (first, _) = restored.tree().children(root).unwrap();
        assert_eq!(restored.node_bounds(first), Some(Rect::new(0.0, 0.0, 400.0, 600.0)));
    }

    #[test]
    fn unresolved_ids_are_purged_after_restore() {
        let mut layout = layout();
        register(&mut layout, "p1");
        let config = LayoutNodeConfig::from_json_str(
            r#"{
                "type": "Container",
                "bounds": { "x": 0, "y": 0, "w": 800, "h": 600 },
                "isVertical": false,
                "firstElement": {
                    "type": "Element",
                    "bounds": { "x": 0, "y": 0, "w": 400, "h": 600 },
                    "render": { "selectedIndex": 1, "panels": ["p1", "gone"] }
                },
                "secondElement": {
                    "type": "Element",
                    "bounds": { "x": 401, "y": 0, "w": 399, "h": 600 },
                    "render": { "selectedIndex": 0, "panels": ["also-gone"] }
                }
            }"#,
        )
        .unwrap();
        layout.apply_layout_config(&config);

        let root = layout.root().unwrap();
        assert!(layout.tree().group(root).is_some());
        assert_eq!(ids(&layout, root), vec!["p1"]);
        assert_eq!(layout.tab_group(root).unwrap().selected_index(), Some(0));
        assert_eq!(layout.node_bounds(root), Some(Rect::new(0.0, 0.0, 800.0, 600.0)));
    }

    #[test]
    fn panels_kept_across_a_restore_are_not_torn_down() {
        let mut layout = layout();
        let (surface, log) = RecordingSurface::new();
        layout.register_panel(Panel::with_surface("p1", "p1", Box::new(surface)));
        layout.open_panel_by_id("p1", false).unwrap();
        assert_eq!(count(&log, &SurfaceCall::Render), 1);

        let config = layout.get_layout_config().unwrap();
        layout.apply_layout_config(&config);

        assert_eq!(count(&log, &SurfaceCall::Remove), 0);
        assert_eq!(count(&log, &SurfaceCall::Render), 1);
        assert!(!layout.registered_panel("p1").unwrap().hold());
        assert!(layout.is_panel_open("p1"));
    }

    #[test]
    fn document_elements_host_a_nested_layout() {
        let (mut layout, e0, e1) = two_columns();
        layout.close_panel_by_id("p2").unwrap();
        assert!(!layout.tree().contains(e1));

        let doc = layout.create_document_element();
        layout.add_box_element(e0, doc, Side::Right);
        let p2 = layout.registered_panel("p2").unwrap();
        layout.add_panel(doc, p2);

        assert_eq!(layout.document_element(), Some(doc));
        assert_eq!(layout.all_tab_groups(), vec![e0]);
        assert!(!layout.is_panel_open("p2"));
        let nested = layout.document_layout(doc).unwrap();
        assert!(nested.is_panel_open("p2"));
        assert_eq!(nested.area(), Size::new(399.0, 600.0));

        let config = layout.get_layout_config().unwrap();
        assert_eq!(config.panel_ids(), vec!["p1", "p2"]);
        let drawn = layout.draw_tree();
        assert!(drawn.contains("DocumentElement"));
        assert!(drawn.contains("*p2"));
    }

    /// `E0{p1}` on the left, a document holding `p2` on the right.
    fn beside_a_document() -> (BoxLayout, NodeId, NodeId, PanelRef) {
        let mut layout = layout();
        register(&mut layout, "p1");
        let p2 = register(&mut layout, "p2");
        layout.open_panel_by_id("p1", false).unwrap();
        let e0 = layout.root().unwrap();
        let doc = layout.create_document_element();
        layout.add_box_element(e0, doc, Side::Right);
        layout.add_panel(doc, p2.clone());
        (layout, e0, doc, p2)
    }

    fn copies_of(layout: &BoxLayout, id: &str) -> usize {
        layout.every_open_panel().iter().filter(|p| p.id() == id).count()
    }

    #[test]
    fn panels_move_between_a_document_and_the_outer_layout() {
        let (mut layout, e0, doc, p2) = beside_a_document();

        layout.add_panel(e0, p2.clone());
        assert_eq!(ids(&layout, e0), vec!["p1", "p2"]);
        assert_eq!(p2.owner(), Some(GroupLocation { layout: layout.key(), node: e0 }));
        assert!(layout.document_layout(doc).unwrap().every_open_panel().is_empty());
        assert_eq!(copies_of(&layout, "p2"), 1);

        let p1 = layout.registered_panel("p1").unwrap();
        layout.add_panel(doc, p1);
        assert_eq!(ids(&layout, e0), vec!["p2"]);
        assert!(layout.document_layout(doc).unwrap().is_panel_open("p1"));
        assert_eq!(copies_of(&layout, "p1"), 1);
    }

    #[test]
    fn opening_a_panel_held_by_a_document_selects_it_there() {
        let (mut layout, e0, doc, _p2) = beside_a_document();
        let p3 = register(&mut layout, "p3");
        layout.add_panel(doc, p3);

        layout.open_panel_by_id("p2", false).unwrap();

        assert_eq!(ids(&layout, e0), vec!["p1"]);
        assert_eq!(copies_of(&layout, "p2"), 1);
        let nested = layout.document_layout(doc).unwrap();
        let inner = nested.element_by_panel_id("p2").unwrap();
        assert_eq!(nested.tab_group(inner).unwrap().selected_panel().unwrap().id(), "p2");

        layout.close_panel_by_id("p2").unwrap();
        assert_eq!(copies_of(&layout, "p2"), 0);
        assert!(layout.document_layout(doc).unwrap().is_panel_open("p3"));
    }

    /// `E0{p1}` beside a document holding a recorded `p2`.
    fn recorded_document() -> (BoxLayout, PanelRef, SurfaceLog, LayoutNodeConfig) {
        let mut layout = layout();
        register(&mut layout, "p1");
        let (surface, log) = RecordingSurface::new();
        let p2 = Panel::with_surface("p2", "p2", Box::new(surface));
        layout.register_panel(p2.clone());
        layout.open_panel_by_id("p1", false).unwrap();
        let only_p1 = layout.get_layout_config().unwrap();
        let e0 = layout.root().unwrap();
        let doc = layout.create_document_element();
        layout.add_box_element(e0, doc, Side::Right);
        layout.add_panel(doc, p2.clone());
        assert!(p2.is_attached());
        (layout, p2, log, only_p1)
    }

    #[test]
    fn restoring_over_a_document_detaches_its_panels() {
        let (mut layout, p2, log, only_p1) = recorded_document();

        layout.apply_layout_config(&only_p1);

        assert_eq!(count(&log, &SurfaceCall::Remove), 1);
        assert!(!p2.is_attached());
        assert!(layout.document_element().is_none());
        assert_eq!(copies_of(&layout, "p2"), 0);
    }

    #[test]
    fn document_panels_kept_across_a_restore_are_not_torn_down() {
        let (mut layout, p2, log, _) = recorded_document();

        let config = layout.get_layout_config().unwrap();
        layout.apply_layout_config(&config);

        assert_eq!(count(&log, &SurfaceCall::Remove), 0);
        assert!(p2.is_attached());
        assert!(!p2.hold());
        let doc = layout.document_element().unwrap();
        assert!(layout.document_layout(doc).unwrap().is_panel_open("p2"));
    }

    #[test]
    fn dragging_onto_a_bottom_edge_splits_vertically() {
        let (mut layout, e0, e1) = two_columns();

        layout.handle_pointer(PointerEvent::down(10.0, 10.0));
        layout.handle_pointer(PointerEvent::moved(600.0, 550.0));
        assert!(matches!(
            layout.drag_proposal(),
            Some(DropProposal::Split { target, side: Side::Bottom }) if *target == e1
        ));
        assert_eq!(layout.drag_ghost(), Some(Rect::new(401.0, 300.0, 399.0, 300.0)));
        layout.handle_pointer(PointerEvent::up(600.0, 550.0));

        assert!(!layout.tree().contains(e0));
        let root = layout.root().unwrap();
        assert_eq!(layout.tree().container(root).unwrap().orientation, Orientation::Vertical);
        let (top, bottom) = layout.tree().children(root).unwrap();
        assert_eq!(top, e1);
        assert_eq!(ids(&layout, bottom), vec!["p1"]);
        let (a, b) = (layout.node_bounds(top).unwrap(), layout.node_bounds(bottom).unwrap());
        assert_eq!((a.x, a.y, a.w), (0.0, 0.0, 800.0));
        assert_eq!(b.y, a.h + 1.0);
        assert_eq!(a.h + 1.0 + b.h, 600.0);
    }

    #[test]
    fn dropping_onto_a_document_edge_docks_beside_it() {
        let (mut layout, e0, doc, _p2) = beside_a_document();
        let p3 = register(&mut layout, "p3");
        layout.add_panel(e0, p3);

        // p3 is the second tab of E0.
        layout.handle_pointer(PointerEvent::down(150.0, 10.0));
        layout.handle_pointer(PointerEvent::moved(780.0, 300.0));
        assert!(matches!(
            layout.drag_proposal(),
            Some(DropProposal::Split { target, side: Side::Right }) if *target == doc
        ));
        let response = layout.handle_pointer(PointerEvent::up(780.0, 300.0));

        assert_eq!(response.drag, Some(DragOutcome::Resolved { panel: "p3".into() }));
        assert_eq!(ids(&layout, e0), vec!["p1"]);
        let parent = layout.tree().parent(doc).unwrap();
        let (first, e2) = layout.tree().children(parent).unwrap();
        assert_eq!(first, doc);
        assert_eq!(ids(&layout, e2), vec!["p3"]);
        assert!(!layout.document_layout(doc).unwrap().is_panel_open("p3"));
    }

    #[test]
    fn pointer_gestures_over_a_document_go_to_its_layout() {
        let (mut layout, _e0, doc, _p2) = beside_a_document();
        let p3 = register(&mut layout, "p3");
        layout.add_panel(doc, p3);

        // The nested tab strip starts at the document's left edge.
        let response = layout.handle_pointer(PointerEvent::down(450.0, 10.0));
        assert!(response.capture_pointer);
        let response = layout.handle_pointer(PointerEvent::moved(451.0, 11.0));
        assert!(response.capture_pointer);
        assert!(!layout.is_dragging());
        let response = layout.handle_pointer(PointerEvent::up(451.0, 11.0));
        assert!(response.handled);

        let nested = layout.document_layout(doc).unwrap();
        let inner = nested.root().unwrap();
        assert_eq!(nested.tab_group(inner).unwrap().selected_panel().unwrap().id(), "p2");

        let response = layout.handle_pointer(PointerEvent::moved(10.0, 300.0));
        assert_eq!(response.cursor, Some(CursorStyle::Default));
    }

    #[test]
    fn tab_menu_setting_reaches_every_tab_bar() {
        let (mut layout, e0, e1) = two_columns();
        layout.take_events();
        layout.set_use_tab_menu(false);

        assert!(!layout.tab_group(e0).unwrap().tab_bar().show_menu());
        assert!(!layout.tab_group(e1).unwrap().tab_bar().show_menu());
        assert_eq!(layout.take_events(), vec![LayoutEvent::ConfigChanged]);
    }
}
