use anyhow::{Result, bail};
use intel::InferOptions;

use crate::Context;
use crate::cli::InferArgs;
use crate::config::Config;
use crate::graph::Graph;
use crate::ui;

pub fn run(ctx: &Context, args: InferArgs) -> Result<()> {
    let config = Config::load()?;
    let system = config.system(args.system.as_deref());
    let graph = Graph::load(&args.graph)?;

    let opts = InferOptions {
        jobs: args.jobs,
        max_passes: args.max_passes,
    };
    let report = super::infer_entities(graph.entities, &opts)?;
    let failed = report.failures.len();

    if args.json {
        let inferred = Graph {
            entities: report.entities,
        };
        println!("{}", serde_json::to_string_pretty(&inferred)?);
    } else {
        if !ctx.quiet {
            ui::header(&format!("Inferred entities ({system})"));
        }
        for entity in &report.entities {
            ui::section(&format!("{} ({}, {})", entity.name, entity.entity_type, entity.id));
            let rendered = entity.properties.render(&system);
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
        if !ctx.quiet {
            println!();
            ui::dim(&format!(
                "{} entities, {} passes",
                report.entities.len(),
                report.passes
            ));
        }
    }

    if failed > 0 {
        bail!("{failed} entities failed inference");
    }
    Ok(())
}
