//! Static page structure of the dashboard.
//!
//! The layout is plain data; `main.rs` walks the tree and draws each node
//! with egui. Charts and controls are referenced by id only, their content is
//! supplied by the app at draw time.

/// Options offered by the workout type dropdown.
pub const WORKOUT_TYPE_OPTIONS: [&str; 5] = ["Base", "Fartlek", "Tempo", "Progression", "Intervals"];

pub const PAGE_TITLE: &str = "Running Performance Dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphId {
    /// Pace vs heart rate, driven by [`ControlId::WorkoutType`].
    HrPace,
    /// Training calendar, driven by [`ControlId::TypeFilter`].
    HrScatter,
    /// Static heart rate histogram.
    HrHist,
}

impl GraphId {
    pub fn key(self) -> &'static str {
        match self {
            GraphId::HrPace => "hr_pace",
            GraphId::HrScatter => "hr_scatter",
            GraphId::HrHist => "hr_hist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    /// Single, clearable selection from [`WORKOUT_TYPE_OPTIONS`].
    WorkoutType,
    /// Multi selection over the loaded type catalog.
    TypeFilter,
}

impl ControlId {
    pub fn key(self) -> &'static str {
        match self {
            ControlId::WorkoutType => "workout_type_dd",
            ControlId::TypeFilter => "type-filter",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Heading { level: u8, text: &'static str },
    Break,
    /// Children drawn side by side.
    Row(Vec<Node>),
    /// Children drawn top to bottom, optionally framed.
    Block { framed: bool, children: Vec<Node> },
    Control(ControlId),
    Graph(GraphId),
    HeartRateInfo,
    DataTable,
}

/// `n` vertical breaks.
pub fn make_break(n: usize) -> Vec<Node> {
    vec![Node::Break; n]
}

fn heading(level: u8, text: &'static str) -> Node {
    Node::Heading { level, text }
}

/// The full dashboard, top to bottom.
pub fn dashboard_layout() -> Node {
    let mut children = vec![
        heading(1, PAGE_TITLE),
        Node::Row(vec![
            Node::Block {
                framed: true,
                children: vec![
                    heading(2, "Controls"),
                    Node::Break,
                    heading(3, "Workout type select"),
                    Node::Control(ControlId::WorkoutType),
                ],
            },
            Node::Graph(GraphId::HrPace),
        ]),
        Node::Block {
            framed: false,
            children: vec![
                heading(2, "Training Calendar"),
                Node::Control(ControlId::TypeFilter),
                Node::Graph(GraphId::HrScatter),
            ],
        },
    ];
    children.extend(make_break(5));
    children.push(heading(2, "Heart Rate Info"));
    children.push(Node::Row(vec![
        Node::HeartRateInfo,
        Node::Graph(GraphId::HrHist),
    ]));
    children.push(Node::Block {
        framed: false,
        children: vec![heading(2, "Data Table Preview"), Node::DataTable],
    });
    Node::Block {
        framed: false,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(node: &Node) -> Vec<&Node> {
        let mut nodes = vec![node];
        if let Node::Row(children) | Node::Block { children, .. } = node {
            for c in children {
                nodes.extend(collect(c));
            }
        }
        nodes
    }

    #[test]
    fn make_break_count() {
        assert_eq!(make_break(3), vec![Node::Break, Node::Break, Node::Break]);
        assert!(make_break(0).is_empty());
    }

    #[test]
    fn every_graph_and_control_appears_once() {
        let layout = dashboard_layout();
        let nodes = collect(&layout);
        for g in [GraphId::HrPace, GraphId::HrScatter, GraphId::HrHist] {
            assert_eq!(nodes.iter().filter(|n| ***n == Node::Graph(g)).count(), 1);
        }
        for c in [ControlId::WorkoutType, ControlId::TypeFilter] {
            assert_eq!(nodes.iter().filter(|n| ***n == Node::Control(c)).count(), 1);
        }
        assert_eq!(nodes.iter().filter(|n| ***n == Node::DataTable).count(), 1);
    }

    #[test]
    fn sections_in_page_order() {
        let layout = dashboard_layout();
        let headings: Vec<&str> = collect(&layout)
            .into_iter()
            .filter_map(|n| match n {
                Node::Heading { level: 1 | 2, text } => Some(*text),
                _ => None,
            })
            .collect();
        assert_eq!(
            headings,
            [
                PAGE_TITLE,
                "Controls",
                "Training Calendar",
                "Heart Rate Info",
                "Data Table Preview"
            ]
        );
    }

    #[test]
    fn ids_match_page_keys() {
        assert_eq!(GraphId::HrPace.key(), "hr_pace");
        assert_eq!(ControlId::TypeFilter.key(), "type-filter");
    }
}
