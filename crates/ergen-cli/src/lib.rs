//! CLI logic for the ergen diagram generator.
//!
//! This module contains the subcommand implementations; `main` only sets up
//! logging and renders errors.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, CheckArgs, Command, GenerateArgs};

use std::{fs, sync::Arc};

use log::{info, warn};

use ergen::{
    ErgenError, check_markup,
    client::GeminiClient,
    model::ModelId,
    orchestrator::{ArtifactOutcome, FixOutcome, GenerationOutcome, Orchestrator},
};

use error_adapter::{DiagnosticAdapter, render};

/// Run the ergen CLI application
///
/// # Errors
///
/// Returns `ErgenError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Invalid markup in `check`
/// - Missing credential, service failures and rejected markup in `generate`
pub async fn run(args: &Args) -> Result<(), ErgenError> {
    match &args.command {
        Command::Generate(generate) => run_generate(args.config.as_ref(), generate).await,
        Command::Check(check) => run_check(check),
        Command::Models => {
            list_models();
            Ok(())
        }
    }
}

async fn run_generate(config_path: Option<&String>, args: &GenerateArgs) -> Result<(), ErgenError> {
    let mut app_config = config::load_config(config_path)?;
    if let Some(model) = args.model {
        app_config.generation_mut().set_model(model);
    }
    if let Some(api_key) = &args.api_key {
        app_config.generation_mut().set_api_key(api_key);
    }

    let description = match (&args.description, &args.input) {
        (Some(description), _) => description.clone(),
        (None, Some(path)) => fs::read_to_string(path)?,
        (None, None) => String::new(),
    };

    info!(
        model = app_config.generation().model().id(),
        output_path = args.output;
        "Generating diagram"
    );

    let client = GeminiClient::new(app_config.generation())?;
    let orchestrator = Orchestrator::from_config(Arc::new(client), &app_config);

    match orchestrator.generate_diagram(&description).await? {
        GenerationOutcome::Committed { attempts } => {
            info!(attempts = attempts; "Diagram generated");
        }
        GenerationOutcome::Superseded => {
            warn!("Generation was superseded");
            return Ok(());
        }
    }
    write_diagram(&orchestrator, &args.output)?;

    if args.apply_fixes {
        orchestrator.audit().await?;
        match orchestrator.apply_fixes().await? {
            FixOutcome::Applied => {
                info!("Audit fixes applied");
                write_diagram(&orchestrator, &args.output)?;
            }
            outcome => warn!(outcome:?; "Audit fixes not applied"),
        }
    }

    if let Some(path) = &args.sql {
        let outcome = orchestrator.export_sql().await?;
        write_artifact("SQL schema", &outcome, path)?;
    }
    if let Some(path) = &args.audit {
        let outcome = orchestrator.audit().await?;
        write_artifact("audit report", &outcome, path)?;
    }

    Ok(())
}

fn write_diagram(orchestrator: &Orchestrator, path: &str) -> Result<(), ErgenError> {
    if let Some(markup) = orchestrator.snapshot().markup {
        fs::write(path, markup + "\n")?;
        info!(output_file = path; "Diagram written");
    }
    Ok(())
}

fn write_artifact(name: &str, outcome: &ArtifactOutcome, path: &str) -> Result<(), ErgenError> {
    match outcome.text() {
        Some(text) => {
            fs::write(path, format!("{text}\n"))?;
            info!(artifact = name, output_file = path; "Artifact written");
        }
        None => warn!(artifact = name, outcome:?; "Nothing to write"),
    }
    Ok(())
}

fn run_check(args: &CheckArgs) -> Result<(), ErgenError> {
    info!(input_path = args.input, raw = args.raw; "Checking diagram");

    let source = fs::read_to_string(&args.input)?;
    let checked = check_markup(&source, args.raw)?;

    for warning in checked.warnings() {
        warn!("{}", render(&DiagnosticAdapter::new(warning, checked.markup())));
    }

    let diagram = checked.diagram();
    println!(
        "{}: {} entities, {} relationships",
        args.input,
        diagram.entity_count(),
        diagram.relationships().len()
    );
    for entity in diagram.entities() {
        println!(
            "  {} ({} attributes)",
            entity.display_name(),
            entity.attributes().len()
        );
    }
    for relationship in diagram.relationships() {
        println!(
            "  {} {}{}{} {} : {}",
            relationship.left(),
            relationship.left_cardinality().left_symbol(),
            if relationship.is_identifying() { "--" } else { ".." },
            relationship.right_cardinality().right_symbol(),
            relationship.right(),
            relationship.label()
        );
    }

    Ok(())
}

fn list_models() {
    for model in ModelId::ALL {
        let marker = if model == ModelId::default() { "*" } else { " " };
        println!("{marker} {:<26} {}", model.id(), model.label());
    }
}
