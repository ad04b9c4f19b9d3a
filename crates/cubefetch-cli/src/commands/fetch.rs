//! Fetch command - Run a query template over a list of IRIs
//!
//! Identifiers are read one per line from a file or stdin. Blank lines and
//! lines starting with `#` are skipped.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cubefetch_client::{Iri, QueryTemplate, Row, Term};
use cubefetch_config::{CacheKind, ConfigOverrides};
use cubefetch_core::{factory, BatchOutcome};
use tracing::{info, warn};

use super::load_config_with;
use crate::GlobalOptions;

/// Arguments for the fetch command
#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Query file containing a {{VALUES}} placeholder
    #[arg(long, short = 't')]
    template: PathBuf,

    /// File with one IRI per line (stdin when omitted or "-")
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// Variable the IRIs are bound to in the VALUES clause
    #[arg(long, default_value = "iri")]
    var: String,

    /// IRIs per query
    #[arg(long, short = 'b')]
    batch_size: Option<usize>,

    /// Maximum queries in flight (0 = unbounded)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Disable the result cache
    #[arg(long)]
    no_cache: bool,

    /// Exit with an error if any batch fails
    #[arg(long)]
    strict: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl FetchArgs {
    fn to_config_overrides(&self, global: &GlobalOptions) -> ConfigOverrides {
        ConfigOverrides {
            batch_size: self.batch_size,
            max_concurrent_batches: self.concurrency,
            cache_kind: self.no_cache.then_some(CacheKind::None),
            ..global.to_config_overrides()
        }
    }
}

/// Execute the fetch command
pub async fn execute(args: FetchArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config_with(&global, args.to_config_overrides(&global))?;
    let loader = factory::create_loader(&config).context("Failed to set up query loader")?;

    let text = std::fs::read_to_string(&args.template)
        .with_context(|| format!("Failed to read template {}", args.template.display()))?;
    let template = QueryTemplate::new(text, &args.var)
        .context("Invalid query template")?
        .with_operation(factory::operation(config.endpoint.operation));

    let input = read_input(args.input.as_deref())?;
    let iris = parse_identifiers(&input)?;
    info!(
        "Fetching {} IRIs from {} in batches of {}",
        iris.len(),
        config.endpoint.url,
        loader.batch_size()
    );

    let outcome = loader.load_template(&template, &iris).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_rows(outcome.rows());
    }

    report_failures(outcome, args.strict)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input {}", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read IRIs from stdin")?;
            Ok(buf)
        }
    }
}

/// Parse one IRI per line, skipping blanks and `#` comments.
fn parse_identifiers(input: &str) -> Result<Vec<Iri>> {
    input
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            // Accept both bare IRIs and <IRI>
            let bare = line
                .strip_prefix('<')
                .and_then(|l| l.strip_suffix('>'))
                .unwrap_or(line);
            Iri::parse(bare).with_context(|| format!("line {}", n))
        })
        .collect()
}

fn report_failures(outcome: BatchOutcome, strict: bool) -> Result<()> {
    if outcome.is_complete() {
        return Ok(());
    }

    let indexes: Vec<String> = outcome
        .failures()
        .iter()
        .map(|f| f.index.to_string())
        .collect();

    if strict {
        outcome
            .into_result()
            .with_context(|| format!("Failed batches: {}", indexes.join(", ")))?;
        return Ok(());
    }

    warn!(
        "{} of {} batches failed (indexes {}); output is partial",
        outcome.failures().len(),
        outcome.batch_count(),
        indexes.join(", ")
    );
    Ok(())
}

/// Print rows as tab separated values with a header of all bound variables.
fn print_rows(rows: &[Row]) {
    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    if columns.is_empty() {
        return;
    }

    println!("{}", columns.iter().copied().collect::<Vec<_>>().join("\t"));
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|col| row.get(*col).map(format_term).unwrap_or_default())
            .collect();
        println!("{}", cells.join("\t"));
    }
}

fn format_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => format!("<{}>", iri),
        Term::BlankNode(id) => format!("_:{}", id),
        Term::Literal(lit) => match (&lit.language, &lit.datatype) {
            (Some(lang), _) => format!("{:?}@{}", lit.value, lang),
            (None, Some(dt)) => format!("{:?}^^<{}>", lit.value, dt),
            (None, None) => format!("{:?}", lit.value),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubefetch_client::Literal;

    #[test]
    fn test_parse_identifiers_skips_comments() {
        let input = "\
# cubes to inspect
https://example.org/cube/1

  <https://example.org/cube/2>
# trailing comment
";
        let iris = parse_identifiers(input).unwrap();
        assert_eq!(iris.len(), 2);
        assert_eq!(iris[1].as_str(), "https://example.org/cube/2");
    }

    #[test]
    fn test_parse_identifiers_reports_line() {
        let err = parse_identifiers("https://example.org/a\nnot an iri\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_format_term() {
        assert_eq!(
            format_term(&Term::Iri("https://example.org/a".into())),
            "<https://example.org/a>"
        );
        assert_eq!(format_term(&Term::BlankNode("b0".into())), "_:b0");
        assert_eq!(
            format_term(&Term::Literal(Literal {
                value: "Wald".into(),
                datatype: None,
                language: Some("de".into()),
            })),
            "\"Wald\"@de"
        );
    }
}
