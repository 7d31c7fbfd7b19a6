//! Starting graphs for new workflows.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::graph::WorkflowGraph;
use crate::node::{
    DelayNodeConfig, DelayUnit, EmailNodeConfig, Node, NodeConfig, NodeKind, Position,
    TriggerNodeConfig,
};
use serde::{Deserialize, Serialize};

/// Graph a new workflow starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphTemplate {
    /// No nodes at all.
    #[default]
    Blank,
    /// A signup trigger wired straight to an end node.
    Skeleton,
    /// Welcome email, two-day wait, follow-up email.
    WelcomeSeries,
}

impl GraphTemplate {
    /// Builds a fresh copy of the template graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the template's own nodes and edges are inconsistent.
    pub fn build(&self) -> Result<WorkflowGraph, GraphError> {
        match self {
            Self::Blank => Ok(WorkflowGraph::new()),
            Self::Skeleton => skeleton(),
            Self::WelcomeSeries => welcome_series(),
        }
    }
}

fn skeleton() -> Result<WorkflowGraph, GraphError> {
    WorkflowGraph::from_parts(
        vec![
            Node::new("trigger-1", NodeKind::Trigger, Position::new(250.0, 50.0))
                .labeled("User Signup"),
            Node::new("end-1", NodeKind::End, Position::new(250.0, 300.0)),
        ],
        vec![Edge::new("e1-2", "trigger-1", "end-1")],
    )
}

fn email(template: &str, subject: &str) -> NodeConfig {
    NodeConfig::Email(EmailNodeConfig {
        subject: subject.to_string(),
        template: Some(template.to_string()),
        ..EmailNodeConfig::default()
    })
}

fn welcome_series() -> Result<WorkflowGraph, GraphError> {
    let at = |x: f64| Position::new(x, 100.0);
    let nodes = vec![
        Node::with_config(
            "trigger-1",
            "Start",
            NodeConfig::Trigger(TriggerNodeConfig::default()),
            at(100.0),
        )
        .with_extra("event", "user_signup"),
        Node::with_config(
            "email-1",
            "Welcome Email",
            email("welcome-template", "Welcome to our platform!"),
            at(300.0),
        )
        .with_extra("templateId", "1"),
        Node::with_config(
            "delay-1",
            "Wait 2 days",
            NodeConfig::Delay(DelayNodeConfig::new(2, DelayUnit::Days)),
            at(500.0),
        ),
        Node::with_config(
            "email-2",
            "Follow-up Email",
            email("followup-template", "How are you enjoying our platform?"),
            at(700.0),
        )
        .with_extra("templateId", "2"),
        Node::new("end-1", NodeKind::End, at(900.0)),
    ];
    let edges = vec![
        Edge::new("e1", "trigger-1", "email-1"),
        Edge::new("e2", "email-1", "delay-1"),
        Edge::new("e3", "delay-1", "email-2"),
        Edge::new("e4", "email-2", "end-1"),
    ];
    WorkflowGraph::from_parts(nodes, edges)
}
