extern crate clap;
use clap::*;

mod cmd;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Command::new("textpair")
        .version(crate_version!())
        .about("Detect shared passages between two corpora of n-gram indexed documents")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd::align::make_subcommand())
        .after_help(
            r###"
* Index files are one JSON file per document, mapping ngram ids to
  [token index, start byte, end byte] occurrence lists
    * the file base name (minus .json) is the document id

* Metadata files map document ids to string fields; the `filename` field
  must point to the original text for context extraction

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("align", sub_matches)) => cmd::align::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
