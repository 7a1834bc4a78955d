use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Start or resume an import run
    Run {
        #[arg(
            long,
            help = "Trigger payload JSON file; the flags below override its fields"
        )]
        payload: Option<String>,

        #[arg(long, help = "Source container/bucket")]
        bucket: Option<String>,

        #[arg(long, help = "Source object key")]
        key: Option<String>,

        #[arg(long, help = "Byte offset committed by a prior run")]
        offset: Option<u64>,

        #[arg(
            long,
            help = "Comma-separated column headers captured by a prior run"
        )]
        headers: Option<String>,

        #[arg(long, help = "Comma-separated column=type cast pairs")]
        type_cast: Option<String>,

        #[arg(
            long,
            default_value = ".",
            help = "Object store root: a local directory, or an http(s) base URL"
        )]
        store: String,

        #[arg(long, default_value_t = 20, help = "Delivery worker pool size")]
        max_threads: usize,

        #[arg(long, default_value_t = 10, help = "Read chunk size in MiB")]
        chunk_size_mb: usize,

        #[arg(
            long,
            default_value_t = 600,
            help = "Wall-clock budget in seconds; 0 disables suspension"
        )]
        time_budget_secs: u64,

        #[arg(
            long,
            default_value_t = 60,
            help = "Reserve margin kept back for the continuation hand-off"
        )]
        time_reserve_secs: u64,
    },

    /// Print the source object's length and header columns
    Inspect {
        #[arg(
            long,
            default_value = ".",
            help = "Object store root: a local directory, or an http(s) base URL"
        )]
        store: String,

        #[arg(long, help = "Source container/bucket")]
        bucket: String,

        #[arg(long, help = "Source object key")]
        key: String,
    },
}
