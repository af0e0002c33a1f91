use arbor_ui_tree::{
    IconResource, NodeId, PointEvent, TapTarget, Tree,
    TreeNodeModel, TreeRowContext, TreeView, TreeViewSettings,
};
use iced::widget::{column, container, row, text};
use iced::{Color, Element, Length};

#[derive(Debug, Clone)]
enum Message {
    Toggle(NodeId),
    Select(NodeId),
    Secondary(NodeId),
    Open(NodeId),
    Hover(Option<NodeId>),
}

struct Task {
    summary: String,
    description: String,
}

impl Task {
    fn new(summary: &str, description: &str) -> Self {
        Self {
            summary: summary.to_owned(),
            description: description.to_owned(),
        }
    }
}

impl TreeNodeModel for Task {
    fn icon(&self) -> Option<IconResource> {
        None
    }

    fn text(&self) -> String {
        self.summary.clone()
    }
}

struct AppState {
    tree: Tree<Task>,
    selected: Option<NodeId>,
    hovered: Option<NodeId>,
    status: String,
}

impl Default for AppState {
    fn default() -> Self {
        let tree = Tree::new();
        let task = |summary: &str, description: &str| {
            tree.insert_node(Task::new(summary, description))
        };

        let release = task("Release", "Ship version 0.2");
        let docs = task("Docs", "Write the changelog");
        let tests = task("tests", "Cover the tree core");
        let chores = task("Chores", "Housekeeping");
        let deps = task("Bump deps", "Update the lockfile");

        for root in [release, chores] {
            tree.insert_root_sorted(root).expect("insert root");
        }
        for child in [tests, docs] {
            tree.insert_sorted(release, child).expect("insert child");
            tree.set_leaf(child).expect("mark leaf");
        }
        tree.append(chores, deps).expect("append child");
        tree.set_leaf(deps).expect("mark leaf");
        tree.expand(release).expect("expand release");

        tree.on_tapped_secondary(docs, |event: &PointEvent| {
            println!("context menu at {}, {}", event.x, event.y);
        })
        .expect("register secondary tap");
        tree.on_double_tapped(deps, |_: &PointEvent| {
            println!("opening lockfile");
        })
        .expect("register double tap");

        Self {
            tree,
            selected: None,
            hovered: None,
            status: String::new(),
        }
    }
}

fn update(state: &mut AppState, message: Message) {
    let at = PointEvent::default();
    let routed = match message {
        Message::Toggle(id) => state.tree.tapped(id, TapTarget::Handle, at),
        Message::Select(id) => {
            state.selected = Some(id);
            if let Ok(task) = state.tree.model(id) {
                state.status = task.description.clone();
            }
            state.tree.tapped(id, TapTarget::Label, at)
        },
        Message::Secondary(id) => state.tree.tapped_secondary(id, at),
        Message::Open(id) => state.tree.double_tapped(id, at),
        Message::Hover(id) => {
            state.hovered = id;
            Ok(())
        },
    };

    if let Err(err) = routed {
        log::warn!("tree interaction failed: {err}");
    }
}

fn view(state: &AppState) -> Element<'_, Message> {
    let tree = TreeView::new(&state.tree, render_row)
        .selected(state.selected)
        .hovered(state.hovered)
        .on_press(Message::Select)
        .on_right_press(Message::Secondary)
        .on_double_press(Message::Open)
        .on_hover(Message::Hover)
        .on_toggle(Message::Toggle)
        .row_style(row_style)
        .settings(TreeViewSettings::default().with_glyphs("v", ">"))
        .view();

    column![tree, text(state.status.clone())].spacing(8).into()
}

fn render_row<'a>(context: &TreeRowContext<Task>) -> Element<'a, Message> {
    let label = context.node.text();
    let row = row![text(label)].spacing(6);
    container(column![row])
        .padding([4, 8])
        .width(Length::Fill)
        .into()
}

fn row_style(context: &TreeRowContext<Task>) -> container::Style {
    let background = if context.is_selected {
        Some(Color::from_rgb(0.12, 0.26, 0.46).into())
    } else if context.is_hovered {
        Some(Color::from_rgb(0.18, 0.18, 0.18).into())
    } else {
        None
    };

    container::Style {
        background,
        text_color: Some(Color::from_rgb(0.9, 0.9, 0.9)),
        ..Default::default()
    }
}

fn main() -> iced::Result {
    iced::run(update, view)
}
