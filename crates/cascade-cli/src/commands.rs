//! CLI command definitions.

use clap::{Subcommand, ValueEnum};

#[derive(Subcommand)]
pub enum Commands {
    /// Check every trigger configuration against the workspace projects
    Validate,

    /// Print the dependency edges and a build order
    Graph,

    /// Replay a completed build and show what gets scheduled
    Simulate {
        /// Project whose build finished
        project: String,

        /// Build number
        #[arg(short, long, default_value_t = 1)]
        number: u32,

        /// Build result (SUCCESS, UNSTABLE, FAILURE, ABORTED)
        #[arg(short, long, default_value = "SUCCESS")]
        result: String,

        /// Revision recorded in the build's changeset (repeatable)
        #[arg(short, long)]
        change: Vec<String>,

        /// Treat the build as the end of a matrix run
        #[arg(long)]
        matrix_end: bool,
    },

    /// List project names starting with a prefix
    Complete {
        /// Name prefix
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Rewrite downstream project references after a rename
    Rename {
        old_name: String,
        new_name: String,

        /// Save the rewritten workspace file
        #[arg(short, long)]
        write: bool,
    },

    /// Print a JSON schema
    Schema {
        #[arg(value_enum, default_value_t = SchemaTarget::Trigger)]
        target: SchemaTarget,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SchemaTarget {
    /// One downstream trigger configuration
    Trigger,
    /// A whole workspace file
    Workspace,
}
