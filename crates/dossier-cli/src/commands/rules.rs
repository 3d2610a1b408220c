use crate::support::{exit_with_error, write_stdout};
use dossier_kernel::{DossierError, Pipeline, RuleCode};
use serde_json::json;

pub fn run<C: RuleCode>(pipeline: &Pipeline<C>, json_output: bool) {
    let descriptor = &pipeline.descriptor;

    if json_output {
        let artifacts: Vec<_> = descriptor
            .artifacts
            .iter()
            .map(|spec| json!({"name": spec.file_name(), "required": spec.required}))
            .collect();
        let payload = json!({
            "pipeline": descriptor.name,
            "agent": descriptor.agent,
            "artifacts": artifacts,
            "acceptance_owner": descriptor.acceptance_owner,
            "registry": pipeline.registry.to_json(),
        });
        let written = serde_json::to_string_pretty(&payload)
            .map_err(DossierError::from)
            .and_then(|mut text| {
                text.push('\n');
                write_stdout(&text)
            });
        if let Err(err) = written {
            exit_with_error(&err);
        }
        return;
    }

    println!("dossier rules {}", descriptor.name);
    println!("  Agent: {}", descriptor.agent);
    println!("  Acceptance owner: {}.json", descriptor.acceptance_owner);
    println!("  Artifacts:");
    for spec in descriptor.artifacts {
        let kind = if spec.required { "required" } else { "optional" };
        println!("    - {} ({kind})", spec.file_name());
    }
    println!("  Rules ({}):", pipeline.registry.rules().len());
    for rule in pipeline.registry.rules() {
        let emits: Vec<&str> = rule.emits.iter().map(|code| code.as_str()).collect();
        println!("    - {} -> {}", rule.id, emits.join(", "));
    }
    println!("  Codes ({}):", C::ALL.len());
    for code in C::ALL {
        let acceptable = if code.is_acceptable() { ", acceptable" } else { "" };
        println!(
            "    - {} [{}{acceptable}] {}",
            code.as_str(),
            code.severity(),
            code.label()
        );
    }
}
