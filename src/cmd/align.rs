use clap::*;
use log::info;

use textpair::{
    list_corpus_files, load_common_ngrams, load_metadata, partition_batches, BatchOptions,
    MatchOptions, OutputFormat, OutputWriter,
};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("align")
        .about("Find shared passages between two n-gram indexed corpora")
        .after_help(
            r###"
* Omitting --target_files compares the source corpus to itself; each
  unordered pair of documents is processed exactly once

* --sort_by orders each corpus and gates the comparison direction: a pair
  is skipped when the source value is greater than the target value

"###,
        )
        .arg(
            Arg::new("source_files")
                .long("source_files")
                .num_args(1)
                .required(true)
                .help("Directory of source n-gram index files"),
        )
        .arg(
            Arg::new("target_files")
                .long("target_files")
                .num_args(1)
                .default_value("")
                .help("Directory of target n-gram index files. Empty for self-comparison"),
        )
        .arg(
            Arg::new("source_metadata")
                .long("source_metadata")
                .num_args(1)
                .default_value("")
                .help("Path to source metadata JSON"),
        )
        .arg(
            Arg::new("target_metadata")
                .long("target_metadata")
                .num_args(1)
                .default_value("")
                .help("Path to target metadata JSON"),
        )
        .arg(
            Arg::new("source_common_ngrams")
                .long("source_common_ngrams")
                .num_args(1)
                .default_value("")
                .help("JSON list of the most common ngrams in source files"),
        )
        .arg(
            Arg::new("target_common_ngrams")
                .long("target_common_ngrams")
                .num_args(1)
                .default_value("")
                .help("JSON list of the most common ngrams in target files"),
        )
        .arg(
            Arg::new("most_common_ngram_threshold")
                .long("most_common_ngram_threshold")
                .num_args(1)
                .default_value("1000")
                .value_parser(value_parser!(usize))
                .help("Take the n most common ngrams from the common ngram lists"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .num_args(1)
                .default_value("4")
                .value_parser(value_parser!(usize))
                .help("Number of threads for parallel processing"),
        )
        .arg(
            Arg::new("batch_size")
                .long("batch_size")
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of steps the full source vs target run is divided into"),
        )
        .arg(
            Arg::new("output_path")
                .long("output_path")
                .num_args(1)
                .default_value("./")
                .help("Output directory for results"),
        )
        .arg(
            Arg::new("output_format")
                .long("output_format")
                .num_args(1)
                .action(ArgAction::Set)
                .value_parser([
                    builder::PossibleValue::new("tab"),
                    builder::PossibleValue::new("html"),
                ])
                .default_value("tab")
                .help("Output format of results"),
        )
        .arg(
            Arg::new("sort_by")
                .long("sort_by")
                .num_args(1)
                .default_value("year")
                .help("Metadata field used to sort files in ascending order"),
        )
        .arg(
            Arg::new("matching_window_size")
                .long("matching_window_size")
                .num_args(1)
                .default_value("20")
                .value_parser(value_parser!(u32))
                .help("Size of the sliding window for matches"),
        )
        .arg(
            Arg::new("max_gap")
                .long("max_gap")
                .num_args(1)
                .default_value("10")
                .value_parser(value_parser!(u32))
                .help("Maximum gap between two matching ngrams"),
        )
        .arg(
            Arg::new("minimum_matching_ngrams")
                .long("minimum_matching_ngrams")
                .num_args(1)
                .default_value("4")
                .value_parser(value_parser!(u32))
                .help("Minimum matching ngrams to constitute a match"),
        )
        .arg(
            Arg::new("minimum_matching_ngram_in_window")
                .long("minimum_matching_ngram_in_window")
                .num_args(1)
                .default_value("4")
                .value_parser(value_parser!(u32))
                .help("Minimum matching ngrams per sliding window"),
        )
        .arg(
            Arg::new("common_ngrams_limit")
                .long("common_ngrams_limit")
                .num_args(1)
                .default_value("75")
                .value_parser(value_parser!(u32))
                .help("Percentage of common ngrams to dismiss a match as banal"),
        )
        .arg(
            Arg::new("minimum_matching_ngrams_in_docs")
                .long("minimum_matching_ngrams_in_docs")
                .num_args(1)
                .default_value("4")
                .value_parser(value_parser!(usize))
                .help("Minimum unique ngrams shared by two docs to start comparison"),
        )
        .arg(
            Arg::new("banal_ngrams")
                .long("banal_ngrams")
                .num_args(1)
                .default_value("25")
                .value_parser(value_parser!(usize))
                .help("Number of top co-occurring ngrams treated as banal per pair"),
        )
        .arg(
            Arg::new("context_size")
                .long("context_size")
                .num_args(1)
                .default_value("300")
                .value_parser(value_parser!(u32))
                .help("Bytes of context shown before and after matching passages"),
        )
        .arg(
            Arg::new("merge_passages_on_byte_distance")
                .long("merge_passages_on_byte_distance")
                .num_args(1)
                .default_value("true")
                .value_parser(value_parser!(bool))
                .help("Merge passages lying within a fraction of the previous passage's length"),
        )
        .arg(
            Arg::new("passage_distance_multiplier")
                .long("passage_distance_multiplier")
                .num_args(1)
                .default_value("0.05")
                .value_parser(value_parser!(f32))
                .help("Merge passages within (multiplier * previous passage length) bytes"),
        )
        .arg(
            Arg::new("two_way_matching")
                .long("two_way_matching")
                .action(ArgAction::SetTrue)
                .help("Also compare target to source and merge the two passes"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let opt_source_files = args.get_one::<String>("source_files").unwrap();
    let opt_target_files = args.get_one::<String>("target_files").unwrap();
    let opt_source_metadata = args.get_one::<String>("source_metadata").unwrap();
    let opt_target_metadata = args.get_one::<String>("target_metadata").unwrap();
    let opt_source_common = args.get_one::<String>("source_common_ngrams").unwrap();
    let opt_target_common = args.get_one::<String>("target_common_ngrams").unwrap();
    let opt_threshold = *args.get_one::<usize>("most_common_ngram_threshold").unwrap();
    let opt_output_path = args.get_one::<String>("output_path").unwrap();
    let opt_output_format =
        OutputFormat::from_name(args.get_one::<String>("output_format").unwrap());

    let opt = MatchOptions {
        matching_window_size: *args.get_one::<u32>("matching_window_size").unwrap(),
        max_gap: *args.get_one::<u32>("max_gap").unwrap(),
        minimum_matching_ngrams: *args.get_one::<u32>("minimum_matching_ngrams").unwrap(),
        minimum_matching_ngrams_in_window: *args
            .get_one::<u32>("minimum_matching_ngram_in_window")
            .unwrap(),
        common_ngrams_limit: *args.get_one::<u32>("common_ngrams_limit").unwrap() as f32 / 100.0,
        minimum_matching_ngrams_in_docs: *args
            .get_one::<usize>("minimum_matching_ngrams_in_docs")
            .unwrap(),
        context_size: *args.get_one::<u32>("context_size").unwrap(),
        banal_ngrams: *args.get_one::<usize>("banal_ngrams").unwrap(),
        merge_on_byte_distance: *args
            .get_one::<bool>("merge_passages_on_byte_distance")
            .unwrap(),
        passage_distance_multiplier: *args.get_one::<f32>("passage_distance_multiplier").unwrap(),
        two_way_matching: args.get_flag("two_way_matching"),
    };
    let batch = BatchOptions {
        threads: (*args.get_one::<usize>("threads").unwrap()).max(1),
        batch_size: (*args.get_one::<usize>("batch_size").unwrap()).max(1),
        sort_field: args.get_one::<String>("sort_by").unwrap().to_string(),
    };

    // Set the number of threads for rayon
    rayon::ThreadPoolBuilder::new()
        .num_threads(batch.threads)
        .build_global()?;

    //----------------------------
    // Load corpora
    //----------------------------
    info!("Loading bibliography...");
    let source_metadata = load_metadata(opt_source_metadata)?;
    let mut target_metadata = load_metadata(opt_target_metadata)?;

    let source_files = list_corpus_files(opt_source_files, &source_metadata, &batch.sort_field)?;
    let target_files = list_corpus_files(opt_target_files, &target_metadata, &batch.sort_field)?;

    let common_ngrams = load_common_ngrams(opt_source_common, opt_target_common, opt_threshold)?;

    let source_batches = partition_batches(&source_files, batch.batch_size);
    let target_batches = partition_batches(&target_files, batch.batch_size);
    if target_files.is_empty() {
        // Self-comparison: the target corpus is the source corpus
        target_metadata = source_metadata.clone();
    }

    //----------------------------
    // Compare and write out
    //----------------------------
    let mut output = OutputWriter::create(
        opt_output_path,
        opt_output_format,
        &source_metadata,
        &target_metadata,
        opt.context_size,
    )?;

    let total = textpair::run(
        &source_batches,
        &target_batches,
        &source_metadata,
        &target_metadata,
        &common_ngrams,
        &opt,
        &batch,
        &mut output,
    )?;
    output.finish()?;

    info!("{} results...", total);

    Ok(())
}
