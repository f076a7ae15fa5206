use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Console for SAP implementation projects")]
pub struct Cli {
    /// Base URL of the project API (overrides SAPDESK_API_URL and the config file)
    #[clap(long, global = true)]
    pub api_url: Option<String>,

    /// Enable debug logging
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage projects
    #[clap(subcommand)]
    Project(RecordCommand),

    /// Manage business scenarios
    #[clap(subcommand)]
    Scenario(RecordCommand),

    /// Manage requirements and convert them into delivery artifacts
    #[clap(subcommand)]
    Requirement(RequirementCommand),

    /// Manage WRICEF items
    #[clap(subcommand)]
    Wricef(ArtifactCommand),

    /// Manage configuration items
    #[clap(subcommand)]
    ConfigItem(ArtifactCommand),

    /// Manage test cases
    #[clap(subcommand)]
    Test(RecordCommand),

    /// Manage analyses
    #[clap(subcommand)]
    Analysis(AnalysisCommand),

    /// Manage analysis sessions and their workspace
    #[clap(subcommand)]
    Session(SessionCommand),

    /// Console configuration
    #[clap(subcommand)]
    Config(ConfigCommand),
}

/// Filters accepted by list commands; each one is sent only when given
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Only records of this project
    #[clap(long)]
    pub project: Option<String>,

    /// Only records of this scenario
    #[clap(long)]
    pub scenario: Option<String>,

    /// Only records of this analysis
    #[clap(long)]
    pub analysis: Option<String>,

    /// Only tests of this type (unit, sit, uat, string, sprint, performance, regression)
    #[clap(long = "type")]
    pub test_type: Option<String>,

    /// Only requirements with this classification (Fit, Partial Fit, Gap)
    #[clap(long)]
    pub classification: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommand {
    /// List records
    List {
        #[clap(flatten)]
        filter: FilterArgs,
    },

    /// Show every field of a record
    Show {
        /// Record ID
        id: String,
    },

    /// Create a record (prompts for fields when no --set is given)
    Add {
        /// Field assignment, e.g. --set title="Three-way match"
        #[clap(long = "set", short = 's', value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Edit a record (prompts for fields when no --set is given)
    Edit {
        /// Record ID
        id: String,

        /// Field assignment, e.g. --set status=closed
        #[clap(long = "set", short = 's', value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Delete a record
    Del {
        /// Record ID
        id: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RequirementCommand {
    #[clap(flatten)]
    Record(RecordCommand),

    /// Convert a classified requirement into a WRICEF or configuration item
    Convert {
        /// Requirement ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ArtifactCommand {
    #[clap(flatten)]
    Record(RecordCommand),

    /// Create a unit test case from the item's unit test steps
    ConvertToTest {
        /// Item ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AnalysisCommand {
    #[clap(flatten)]
    Record(RecordCommand),

    /// List the sessions of an analysis
    Sessions {
        /// Analysis ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    #[clap(flatten)]
    Record(RecordCommand),

    /// Show one or all workspace sections of a session
    Tab {
        /// Session ID
        id: String,

        /// Section to show (questions, fitgap, decisions, risks, actions, attendees, agenda)
        #[clap(default_value = "questions")]
        section: String,

        /// Show every section
        #[clap(long, short = 'a')]
        all: bool,
    },

    /// Add an item to a session section
    AddItem {
        /// Session ID
        id: String,

        /// Section the item belongs to
        section: String,

        /// Field assignment, e.g. --set probability=3
        #[clap(long = "set", short = 's', value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Edit an item in a session section
    EditItem {
        /// Session ID
        id: String,

        /// Section the item belongs to
        section: String,

        /// Item ID
        item: String,

        /// Field assignment, e.g. --set answer_text="Finance lead"
        #[clap(long = "set", short = 's', value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Write a default configuration file if none exists
    Init,

    /// Print the path of the configuration file
    Path,
}
