//! Declarative command tree and its conversion to clap.

use std::fmt::Write as _;

use clap::Command;

use crate::flags::{ArgSpec, Constraint, FlagSpec};
use crate::pipeline::Leaf;

/// A usage example shown in help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Example {
    /// What the example does.
    pub description: &'static str,
    /// Literal command line.
    pub command: &'static str,
}

/// Children of a branch, or the runnable leaf.
pub enum NodeBody {
    /// A group of subcommands.
    Branch(Vec<CommandNode>),
    /// A runnable command.
    Leaf(Box<dyn Leaf>),
}

/// One node of the command tree.
pub struct CommandNode {
    /// Subcommand name.
    pub name: &'static str,
    /// One-line description.
    pub about: &'static str,
    /// Long description shown by `--help`.
    pub long_about: Option<&'static str>,
    /// Usage examples.
    pub examples: Vec<Example>,
    /// Positional arguments.
    pub args: Vec<ArgSpec>,
    /// Leaf flags.
    pub flags: Vec<FlagSpec>,
    /// Group rules over `flags`.
    pub constraints: Vec<Constraint>,
    /// Whether the leaf needs a project ID.
    pub requires_project: bool,
    /// Children or leaf.
    pub body: NodeBody,
}

impl std::fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let children: Vec<&str> = self.children().iter().map(|c| c.name).collect();
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("children", &children)
            .field("leaf", &self.is_leaf())
            .finish_non_exhaustive()
    }
}

impl CommandNode {
    /// Creates a branch without children.
    #[must_use]
    pub fn branch(name: &'static str, about: &'static str) -> Self {
        Self {
            name,
            about,
            long_about: None,
            examples: Vec::new(),
            args: Vec::new(),
            flags: Vec::new(),
            constraints: Vec::new(),
            requires_project: false,
            body: NodeBody::Branch(Vec::new()),
        }
    }

    /// Creates a leaf that requires a project ID.
    #[must_use]
    pub fn leaf(name: &'static str, about: &'static str, leaf: impl Leaf + 'static) -> Self {
        Self {
            requires_project: true,
            body: NodeBody::Leaf(Box::new(leaf)),
            ..Self::branch(name, about)
        }
    }

    /// Sets the long description.
    #[must_use]
    pub const fn long_about(mut self, text: &'static str) -> Self {
        self.long_about = Some(text);
        self
    }

    /// Adds an example.
    #[must_use]
    pub fn example(mut self, description: &'static str, command: &'static str) -> Self {
        self.examples.push(Example { description, command });
        self
    }

    /// Adds a positional argument.
    #[must_use]
    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    /// Adds a flag.
    #[must_use]
    pub fn flag(mut self, flag: FlagSpec) -> Self {
        self.flags.push(flag);
        self
    }

    /// Adds flag constraints.
    #[must_use]
    pub fn constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// Lets the leaf run without a project ID.
    #[must_use]
    pub const fn without_project(mut self) -> Self {
        self.requires_project = false;
        self
    }

    /// Adds a child to a branch. Ignored on leaves.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        if let NodeBody::Branch(children) = &mut self.body {
            children.push(child);
        }
        self
    }

    /// True if the node is runnable.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.body, NodeBody::Leaf(_))
    }

    /// Children of a branch; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match &self.body {
            NodeBody::Branch(children) => children,
            NodeBody::Leaf(_) => &[],
        }
    }

    /// Finds a direct child by name.
    #[must_use]
    pub fn find_child(&self, name: &str) -> Option<&Self> {
        self.children().iter().find(|c| c.name == name)
    }

    /// Walks a path of subcommand names from this node.
    #[must_use]
    pub fn find(&self, path: &[&str]) -> Option<&Self> {
        path.iter().try_fold(self, |node, name| node.find_child(name))
    }

    /// Calls `visit` for every leaf with its full path.
    pub fn visit_leaves<'a>(&'a self, prefix: &mut Vec<&'a str>, visit: &mut dyn FnMut(&[&'a str], &'a Self)) {
        prefix.push(self.name);
        if self.is_leaf() {
            visit(prefix, self);
        }
        for child in self.children() {
            child.visit_leaves(prefix, visit);
        }
        prefix.pop();
    }

    /// Converts the subtree into a clap command.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(self.name).about(self.about);
        if let Some(long) = self.long_about {
            command = command.long_about(long);
        }
        if !self.examples.is_empty() {
            command = command.after_help(render_examples(&self.examples));
        }
        for arg in &self.args {
            command = command.arg(arg.to_arg());
        }
        command = command.args(self.flags.iter().map(FlagSpec::to_arg));
        for child in self.children() {
            command = command.subcommand(child.to_command());
        }
        command
    }
}

fn render_examples(examples: &[Example]) -> String {
    let mut out = String::from("Examples:");
    for example in examples {
        let _ = write!(out, "\n  {}\n  $ {}\n", example.description, example.command);
    }
    out.trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::pipeline::{Context, Invocation};
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Leaf for Noop {
        async fn run(&self, _ctx: &Context, _inv: &Invocation) -> Result<()> {
            Ok(())
        }
    }

    fn tree() -> CommandNode {
        CommandNode::branch("stackit", "STACKIT CLI").child(
            CommandNode::branch("kms", "KMS").child(
                CommandNode::leaf("list", "List things", Noop)
                    .example("List key rings", "stackit kms list --project-id xxx")
                    .flag(FlagSpec::uuid("key-ring", "Key ring ID").required()),
            ),
        )
    }

    #[test]
    fn finds_nodes_by_path() {
        let root = tree();
        let leaf = root.find(&["kms", "list"]).expect("leaf");
        assert!(leaf.is_leaf());
        assert!(leaf.requires_project);
        assert!(root.find(&["kms", "nope"]).is_none());
        assert!(!root.find(&["kms"]).expect("branch").is_leaf());
    }

    #[test]
    fn visits_every_leaf_with_its_path() {
        let root = tree();
        let mut paths = Vec::new();
        root.visit_leaves(&mut Vec::new(), &mut |path, _| paths.push(path.join(" ")));
        assert_eq!(paths, vec!["stackit kms list"]);
    }

    #[test]
    fn examples_render_in_help() {
        let mut command = tree().to_command();
        command.build();
        let leaf = command
            .find_subcommand_mut("kms")
            .and_then(|kms| kms.find_subcommand_mut("list"))
            .expect("leaf");
        let help = leaf.render_long_help().to_string();
        assert!(help.contains("Examples:\n  List key rings\n  $ stackit kms list --project-id xxx"), "{help}");
        assert!(help.contains("--key-ring"), "{help}");
    }

    #[test]
    fn clap_tree_is_consistent() {
        tree().to_command().debug_assert();
    }
}
