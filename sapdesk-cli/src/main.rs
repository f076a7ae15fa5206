mod cli;
mod display;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::debug;
use std::path::Path;

use sapdesk_core::convert::{conversion_block, conversion_target};
use sapdesk_core::session_items::{
    ActionItem, AgendaItem, Attendee, Decision, FitGapItem, Question, RiskOrIssue,
};
use sapdesk_core::view::SessionView;
use sapdesk_core::{
    get_config_path, Analysis, ApiClient, ConfigItem, ConsoleConfig, Entity, ListFilter, LoadState,
    Notice, Project, RecordId, Requirement, Scenario, Section, SessionItem, SessionWorkspace,
    SlotState, TestCase, TestSource, ViewController, WricefItem,
};

use crate::cli::{
    AnalysisCommand, ArtifactCommand, Cli, Command, ConfigCommand, FilterArgs, RecordCommand,
    RequirementCommand, SessionCommand,
};
use crate::display::{print_record, print_table, Listing};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config_path = get_config_path()?;
    let mut config = ConsoleConfig::load_or_default(&config_path)?;
    config.apply_overrides(std::env::var("SAPDESK_API_URL").ok(), cli.api_url.as_deref());

    if let Command::Config(config_cmd) = &cli.command {
        return handle_config_command(config_cmd, &config, &config_path);
    }

    let client = config.client()?;
    debug!("Using {} transport at {}", client.transport_name(), config.api_url);

    match &cli.command {
        Command::Project(cmd) => handle_record_command::<Project>(cmd, &client, &config)?,
        Command::Scenario(cmd) => handle_record_command::<Scenario>(cmd, &client, &config)?,
        Command::Requirement(cmd) => match cmd {
            RequirementCommand::Record(cmd) => {
                handle_record_command::<Requirement>(cmd, &client, &config)?
            }
            RequirementCommand::Convert { id } => convert_requirement(&client, id)?,
        },
        Command::Wricef(cmd) => handle_artifact_command::<WricefItem>(cmd, &client, &config)?,
        Command::ConfigItem(cmd) => handle_artifact_command::<ConfigItem>(cmd, &client, &config)?,
        Command::Test(cmd) => handle_record_command::<TestCase>(cmd, &client, &config)?,
        Command::Analysis(cmd) => match cmd {
            AnalysisCommand::Record(cmd) => handle_record_command::<Analysis>(cmd, &client, &config)?,
            AnalysisCommand::Sessions { id } => list_analysis_sessions(&client, &config, id)?,
        },
        Command::Session(cmd) => handle_session_command(cmd, &client, &config)?,
        Command::Config(_) => {}
    }

    Ok(())
}

fn parse_id(id_str: &str) -> RecordId {
    RecordId::from(id_str)
}

fn to_filter(args: &FilterArgs) -> ListFilter {
    let mut filter = ListFilter::new();
    if let Some(project) = &args.project {
        filter = filter.project(parse_id(project));
    }
    if let Some(scenario) = &args.scenario {
        filter = filter.scenario(parse_id(scenario));
    }
    if let Some(analysis) = &args.analysis {
        filter = filter.analysis(parse_id(analysis));
    }
    if let Some(test_type) = &args.test_type {
        filter = filter.test_type(test_type.as_str());
    }
    if let Some(classification) = &args.classification {
        filter = filter.classification(classification.as_str());
    }
    filter
}

fn print_notice(notice: Option<&Notice>) {
    match notice {
        Some(Notice::Success(message)) => println!("{}", message.green()),
        Some(Notice::Failure(message)) => println!("{}", message.red()),
        None => {}
    }
}

fn view_for<E: Entity>(config: &ConsoleConfig, filter: ListFilter) -> ViewController<E> {
    ViewController::<E>::new()
        .with_filter(filter)
        .with_empty_message(config.empty_message(E::COLLECTION))
}

fn print_list<E: Entity + Listing>(view: &ViewController<E>) {
    match view.load_state() {
        LoadState::Populated => print_table(view.rows()),
        LoadState::Empty => println!("{}", view.empty_message().yellow()),
        LoadState::Loading => println!("{}", "Loading...".dimmed()),
    }
}

fn fetch<E: Entity>(client: &ApiClient, id_str: &str) -> Result<E> {
    client
        .resource::<E>()
        .get(&parse_id(id_str))
        .with_context(|| format!("Failed to load {} {}", E::LABEL, id_str))
}

/// Saves the open editor, printing its failure notice if the save is refused
fn save<E: Entity>(view: &mut ViewController<E>, client: &ApiClient) -> Result<E> {
    match view.save(client) {
        Ok(saved) => Ok(saved),
        Err(e) => {
            print_notice(view.editor().and_then(|editor| editor.notice()));
            Err(e.into())
        }
    }
}

fn handle_record_command<E: Entity + Listing>(
    cmd: &RecordCommand,
    client: &ApiClient,
    config: &ConsoleConfig,
) -> Result<()> {
    match cmd {
        RecordCommand::List { filter } => {
            let mut view = view_for::<E>(config, to_filter(filter));
            view.refresh(client);
            print_list(&view);
        }
        RecordCommand::Show { id } => {
            let record = fetch::<E>(client, id)?;
            print_record(&record)?;
        }
        RecordCommand::Add { set } => {
            let mut view = view_for::<E>(config, ListFilter::new());
            let editor = view.open_new()?;
            let draft = prompts::fill_draft(editor.draft(), set)?;
            editor.edit(|d| *d = draft);

            let saved = save(&mut view, client)?;
            println!("{}", format!("Created {} {}", E::LABEL, saved.id()).green());
        }
        RecordCommand::Edit { id, set } => {
            let record = fetch::<E>(client, id)?;
            let mut view = view_for::<E>(config, ListFilter::new());
            view.open_editor(client, Some(record))?;

            let editor = view
                .editor_mut()
                .context("Editor did not open")?;
            let draft = prompts::fill_draft(editor.draft(), set)?;
            editor.edit(|d| *d = draft);
            if !editor.form().is_dirty() {
                println!("{}", "No changes.".yellow());
                return Ok(());
            }

            let saved = save(&mut view, client)?;
            println!("{}", format!("Updated {} {}", E::LABEL, saved.id()).green());
        }
        RecordCommand::Del { id, yes } => {
            let record = fetch::<E>(client, id)?;
            println!("{}", format!("{} to delete:", E::LABEL).yellow());
            print_table(std::slice::from_ref(&record));

            if !*yes && !prompts::confirm_delete(E::LABEL)? {
                println!("{}", "Deletion cancelled.".yellow());
                return Ok(());
            }

            let mut view = view_for::<E>(config, ListFilter::new());
            view.delete(client, record.id())?;
            println!("{}", format!("Deleted {} {}", E::LABEL, id).green());
        }
    }
    Ok(())
}

fn convert_requirement(client: &ApiClient, id_str: &str) -> Result<()> {
    let record = fetch::<Requirement>(client, id_str)?;
    if let Some(reason) = conversion_block(&record) {
        println!("{}", format!("Cannot convert: {}", reason).yellow());
        return Ok(());
    }
    if let Some(classification) = record.fields.classification {
        println!(
            "Converting {} ({}) to a {} item",
            record.fields.code.as_deref().unwrap_or(id_str),
            classification,
            conversion_target(classification)
        );
    }

    let mut view = ViewController::<Requirement>::new();
    view.open_editor(client, Some(record))?;
    let result = view.convert(client);
    print_notice(view.editor().and_then(|e| e.notice()));
    result?;
    Ok(())
}

fn handle_artifact_command<E: TestSource + Listing>(
    cmd: &ArtifactCommand,
    client: &ApiClient,
    config: &ConsoleConfig,
) -> Result<()> {
    match cmd {
        ArtifactCommand::Record(cmd) => handle_record_command::<E>(cmd, client, config),
        ArtifactCommand::ConvertToTest { id } => {
            let record = fetch::<E>(client, id)?;
            let mut view = view_for::<E>(config, ListFilter::new());
            view.open_editor(client, Some(record))?;
            let result = view.convert_to_test(client);
            print_notice(view.editor().and_then(|e| e.notice()));
            let receipt = result?;
            if let Some(test_id) = receipt.test_id {
                println!("Test case: {}", test_id.to_string().green());
            }
            Ok(())
        }
    }
}

fn list_analysis_sessions(client: &ApiClient, config: &ConsoleConfig, id_str: &str) -> Result<()> {
    let analysis = fetch::<Analysis>(client, id_str)?;
    println!("{} {}", "Analysis:".blue().bold(), analysis.fields.title);

    let mut view: SessionView = view_for(config, ListFilter::new().analysis(analysis.id.clone()));
    view.refresh(client);
    print_list(&view);
    Ok(())
}

// =========================================================================
// Session workspace
// =========================================================================

fn parse_section(section: &str) -> Result<Section> {
    section
        .parse::<Section>()
        .map_err(|e| anyhow::anyhow!(e))
}

/// Calls a generic function with the item type of a section
macro_rules! for_section {
    ($section:expr, $func:ident($($arg:expr),*)) => {
        match $section {
            Section::Questions => $func::<Question>($($arg),*),
            Section::FitGap => $func::<FitGapItem>($($arg),*),
            Section::Decisions => $func::<Decision>($($arg),*),
            Section::Risks => $func::<RiskOrIssue>($($arg),*),
            Section::Actions => $func::<ActionItem>($($arg),*),
            Section::Attendees => $func::<Attendee>($($arg),*),
            Section::Agenda => $func::<AgendaItem>($($arg),*),
        }
    };
}

fn print_section<T: SessionItem + Listing>(workspace: &SessionWorkspace) {
    let section = T::SECTION;
    println!("\n{}", section.label().blue().bold());
    match workspace.state(section) {
        SlotState::Loaded if workspace.items::<T>().is_empty() => {
            println!("{}", format!("No {} yet.", section.label().to_lowercase()).yellow())
        }
        SlotState::Loaded => print_table(workspace.items::<T>()),
        SlotState::Errored => println!("{}", "Could not load this section.".red()),
        SlotState::Loading | SlotState::Unloaded => println!("{}", "Loading...".dimmed()),
    }
}

fn open_workspace(client: &ApiClient, id_str: &str) -> SessionWorkspace {
    let mut workspace = SessionWorkspace::new();
    match workspace.open(client, parse_id(id_str)) {
        Some(session) => println!(
            "{} {} [{}]",
            "Session:".blue().bold(),
            session.fields.session_name,
            session.fields.status
        ),
        None => println!("{} {}", "Session:".blue().bold(), id_str),
    }
    workspace
}

fn add_item<T: SessionItem + Listing>(
    client: &ApiClient,
    workspace: &mut SessionWorkspace,
    set: &[String],
) -> Result<()> {
    let draft = prompts::fill_draft(&T::Draft::default(), set)?;
    let created: T = workspace.create(client, draft)?;
    println!("{}", format!("Added {} item {}", T::SECTION, created.id()).green());
    print_section::<T>(workspace);
    Ok(())
}

fn edit_item<T: SessionItem + Listing>(
    client: &ApiClient,
    workspace: &mut SessionWorkspace,
    item_id: &RecordId,
    set: &[String],
) -> Result<()> {
    workspace.activate(client, T::SECTION)?;
    let current = workspace
        .items::<T>()
        .iter()
        .find(|item| item.id() == item_id)
        .with_context(|| format!("No {} item {} in this session", T::SECTION, item_id))?
        .draft();

    let draft = prompts::fill_draft(&current, set)?;
    if draft == current {
        println!("{}", "No changes.".yellow());
        return Ok(());
    }
    let updated: T = workspace.update(client, item_id, draft)?;
    println!("{}", format!("Updated {} item {}", T::SECTION, updated.id()).green());
    print_section::<T>(workspace);
    Ok(())
}

fn handle_session_command(cmd: &SessionCommand, client: &ApiClient, config: &ConsoleConfig) -> Result<()> {
    match cmd {
        SessionCommand::Record(cmd) => handle_record_command::<sapdesk_core::Session>(cmd, client, config)?,
        SessionCommand::Tab { id, section, all } => {
            let mut workspace = open_workspace(client, id);
            let sections = if *all {
                Section::ALL.to_vec()
            } else {
                vec![parse_section(section)?]
            };
            for section in sections {
                workspace.activate(client, section)?;
                for_section!(section, print_section(&workspace));
            }
        }
        SessionCommand::AddItem { id, section, set } => {
            let section = parse_section(section)?;
            let mut workspace = open_workspace(client, id);
            for_section!(section, add_item(client, &mut workspace, set))?;
        }
        SessionCommand::EditItem {
            id,
            section,
            item,
            set,
        } => {
            let section = parse_section(section)?;
            let item_id = parse_id(item);
            let mut workspace = open_workspace(client, id);
            for_section!(section, edit_item(client, &mut workspace, &item_id, set))?;
        }
    }
    Ok(())
}

// =========================================================================
// Configuration
// =========================================================================

fn handle_config_command(cmd: &ConfigCommand, config: &ConsoleConfig, path: &Path) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            println!("{}", "Configuration:".blue().bold());
            println!();
            println!("{}: {}", "File".cyan(), path.display());
            println!("{}: {}", "API URL".cyan(), config.api_url);
            println!("{}: {}", "API prefix".cyan(), config.api_prefix);
            if !config.empty_messages.is_empty() {
                println!("\n{}", "Empty-state messages:".blue());
                for (collection, message) in &config.empty_messages {
                    println!("  {}: {}", collection, message);
                }
            }
        }
        ConfigCommand::Init => {
            if ConsoleConfig::create_default(path)? {
                println!("{} Wrote default configuration to {}", "✓".green(), path.display());
            } else {
                println!(
                    "{}",
                    format!("Configuration already exists at {}", path.display()).yellow()
                );
            }
        }
        ConfigCommand::Path => println!("{}", path.display()),
    }
    Ok(())
}
