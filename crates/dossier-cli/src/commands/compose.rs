use crate::cli::ComposeArgs;
use crate::support::{
    check_output_path, exit_with_error, parse_as_of_or_exit, require_dir, write_output,
    write_stdout,
};
use dossier_kernel::{ComposeOptions, Pipeline, RuleCode};

pub fn run<C: RuleCode>(pipeline: &Pipeline<C>, args: ComposeArgs) {
    let name = pipeline.descriptor.name;
    let as_of = parse_as_of_or_exit(args.as_of.as_deref());
    if let Err(err) = require_dir(&args.dir) {
        exit_with_error(&err);
    }
    // Refuse a bad output path before any work is done.
    if let Some(Err(err)) = args.output.as_deref().map(check_output_path) {
        exit_with_error(&err);
    }

    let artifacts = pipeline.load(&args.dir);
    let composition = pipeline.compose(&artifacts, &ComposeOptions { as_of });
    tracing::info!(
        pipeline = name,
        found = composition.validation.artifacts_found.len(),
        findings = composition.validation.warnings.len(),
        "composed report"
    );

    let payload = composition
        .to_json(args.pretty)
        .unwrap_or_else(|e| exit_with_error(&e));
    let written = match &args.output {
        Some(path) => write_output(path, &payload),
        None => write_stdout(&payload),
    };
    if let Err(err) = written {
        exit_with_error(&err);
    }

    for line in composition.summary_lines() {
        eprintln!("[{name}] {line}");
    }
    if let Some(path) = &args.output {
        eprintln!("[{name}] Report written to {}", path.display());
    }

    if args.strict && composition.blocks_strict() {
        eprintln!("[{name}] STRICT MODE: Exiting with code 1 due to warnings");
        std::process::exit(1);
    }
}
