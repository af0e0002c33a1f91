use iced::alignment;
use iced::widget::{Column, Row, Space, container, mouse_area, text};
use iced::{Element, Length, mouse};

use crate::flatten::VisibleRow;
use crate::model::TreeNodeModel;
use crate::settings::TreeViewSettings;
use crate::tree::{NodeId, NodeRef, Tree};

/// Rendering context passed to row callbacks.
pub struct TreeRowContext<M> {
    pub row: VisibleRow,
    pub node: NodeRef<M>,
    pub is_selected: bool,
    pub is_hovered: bool,
}

type RowRenderer<'a, M, Message> =
    dyn Fn(&TreeRowContext<M>) -> Element<'a, Message> + 'a;
type RowStyle<'a, M> = dyn Fn(&TreeRowContext<M>) -> container::Style + 'a;
type RowAction<'a, Message> = dyn Fn(NodeId) -> Message + 'a;
type HoverAction<'a, Message> = dyn Fn(Option<NodeId>) -> Message + 'a;

/// iced renderer for a [`Tree`].
///
/// Draws [`Tree::visible_rows`] with indentation and an expand handle, and
/// maps pointer interaction to host messages. The host forwards those
/// messages to [`Tree::tapped`] and friends; the tree fires its refresh
/// notification and the next `view` call picks up the new state.
pub struct TreeView<'a, M, Message: Clone + 'a> {
    tree: &'a Tree<M>,
    selected: Option<NodeId>,
    hovered: Option<NodeId>,
    on_press: Option<Box<RowAction<'a, Message>>>,
    on_right_press: Option<Box<RowAction<'a, Message>>>,
    on_double_press: Option<Box<RowAction<'a, Message>>>,
    on_hover: Option<Box<HoverAction<'a, Message>>>,
    on_toggle: Option<Box<RowAction<'a, Message>>>,
    render_row: Box<RowRenderer<'a, M, Message>>,
    row_style: Option<Box<RowStyle<'a, M>>>,
    settings: TreeViewSettings,
}

impl<'a, M, Message> TreeView<'a, M, Message>
where
    M: TreeNodeModel,
    Message: Clone + 'a,
{
    /// Create a tree view that renders each row using `render_row`.
    pub fn new(
        tree: &'a Tree<M>,
        render_row: impl Fn(&TreeRowContext<M>) -> Element<'a, Message> + 'a,
    ) -> Self {
        Self {
            tree,
            selected: None,
            hovered: None,
            on_press: None,
            on_right_press: None,
            on_double_press: None,
            on_hover: None,
            on_toggle: None,
            render_row: Box::new(render_row),
            row_style: None,
            settings: TreeViewSettings::default(),
        }
    }

    pub fn selected(mut self, id: Option<NodeId>) -> Self {
        self.selected = id;
        self
    }

    pub fn hovered(mut self, id: Option<NodeId>) -> Self {
        self.hovered = id;
        self
    }

    /// Emit a message when a row receives a left press.
    pub fn on_press(
        mut self,
        on_press: impl Fn(NodeId) -> Message + 'a,
    ) -> Self {
        self.on_press = Some(Box::new(on_press));
        self
    }

    /// Emit a message when a row receives a right press.
    pub fn on_right_press(
        mut self,
        on_right_press: impl Fn(NodeId) -> Message + 'a,
    ) -> Self {
        self.on_right_press = Some(Box::new(on_right_press));
        self
    }

    /// Emit a message when a row is double clicked.
    pub fn on_double_press(
        mut self,
        on_double_press: impl Fn(NodeId) -> Message + 'a,
    ) -> Self {
        self.on_double_press = Some(Box::new(on_double_press));
        self
    }

    /// Emit a message when the pointer enters or leaves a row.
    pub fn on_hover(
        mut self,
        on_hover: impl Fn(Option<NodeId>) -> Message + 'a,
    ) -> Self {
        self.on_hover = Some(Box::new(on_hover));
        self
    }

    /// Emit a message when the expand handle of a branch is pressed.
    pub fn on_toggle(
        mut self,
        on_toggle: impl Fn(NodeId) -> Message + 'a,
    ) -> Self {
        self.on_toggle = Some(Box::new(on_toggle));
        self
    }

    pub fn row_style(
        mut self,
        row_style: impl Fn(&TreeRowContext<M>) -> container::Style + 'a,
    ) -> Self {
        self.row_style = Some(Box::new(row_style));
        self
    }

    pub fn settings(mut self, settings: TreeViewSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn indent_width(mut self, width: f32) -> Self {
        self.settings = self.settings.with_indent_width(width);
        self
    }

    pub fn toggle_width(mut self, width: f32) -> Self {
        self.settings = self.settings.with_toggle_width(width);
        self
    }

    pub fn spacing(mut self, spacing: f32) -> Self {
        self.settings = self.settings.with_spacing(spacing);
        self
    }

    /// Build the `Element` for the tree view.
    pub fn view(self) -> Element<'a, Message> {
        let mut column = Column::new().spacing(self.settings.spacing);

        for row in self.tree.visible_rows() {
            let Ok(node) = self.tree.node(row.id) else {
                continue;
            };
            let context = TreeRowContext {
                row,
                node,
                is_selected: self.selected == Some(row.id),
                is_hovered: self.hovered == Some(row.id),
            };

            let content = self.wrap_mouse_area(
                (self.render_row)(&context),
                row.id,
            );

            let mut line = Row::new().spacing(0.0);
            let indent = row.depth as f32 * self.settings.indent_width;
            if indent > 0.0 {
                line = line.push(Space::new().width(Length::Fixed(indent)));
            }
            if self.settings.toggle_width > 0.0 {
                line = line.push(self.toggle_slot(&context));
            }
            line = line.push(content);

            let mut element: Element<'a, Message> = line.into();
            if let Some(ref row_style) = self.row_style {
                let style = row_style(&context);
                element = container(element).style(move |_| style).into();
            }

            column = column.push(element);
        }

        column.into()
    }

    fn toggle_slot(&self, context: &TreeRowContext<M>) -> Element<'a, Message> {
        let is_branch = context.node.is_branch();
        let glyph: Element<'a, Message> = if is_branch {
            text(
                self.settings
                    .glyph(context.node.is_expanded())
                    .to_owned(),
            )
            .into()
        } else {
            Space::new().into()
        };

        let slot: Element<'a, Message> = container(glyph)
            .width(Length::Fixed(self.settings.toggle_width))
            .height(Length::Fill)
            .align_x(alignment::Horizontal::Center)
            .align_y(alignment::Vertical::Center)
            .into();

        match self.on_toggle.as_deref() {
            Some(on_toggle) if is_branch => mouse_area(slot)
                .on_press(on_toggle(context.row.id))
                .interaction(mouse::Interaction::Pointer)
                .into(),
            _ => slot,
        }
    }

    fn wrap_mouse_area(
        &self,
        element: Element<'a, Message>,
        id: NodeId,
    ) -> Element<'a, Message> {
        if self.on_press.is_none()
            && self.on_right_press.is_none()
            && self.on_double_press.is_none()
            && self.on_hover.is_none()
        {
            return element;
        }

        let mut area = mouse_area(element);

        if let Some(on_press) = &self.on_press {
            area = area.on_press(on_press(id));
        }

        if let Some(on_right_press) = &self.on_right_press {
            area = area.on_right_press(on_right_press(id));
        }

        if let Some(on_double_press) = &self.on_double_press {
            area = area.on_double_click(on_double_press(id));
        }

        if let Some(on_hover) = &self.on_hover {
            area = area.on_enter(on_hover(Some(id))).on_exit(on_hover(None));
        }

        area.interaction(mouse::Interaction::Pointer).into()
    }
}
