use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    /// Count the records matching a query
    Count {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Print every record matching a query as one JSON object per line
    Each {
        #[command(flatten)]
        query: QueryArgs,

        #[arg(
            long = "order",
            help = "Sort key, <field> or <field>:desc; repeat for secondary keys"
        )]
        order_by: Vec<String>,

        #[arg(long, help = "Stop after this many records")]
        limit: Option<usize>,
    },
}

#[derive(Args)]
pub struct QueryArgs {
    #[arg(long, help = "CSV file to query")]
    pub file: String,

    #[arg(long, help = "Entity name; defaults to the file stem")]
    pub entity: Option<String>,

    #[arg(
        long = "where",
        help = "Filter as <field><op><value> with op one of = != < <= > >=; repeatable"
    )]
    pub filters: Vec<String>,

    #[arg(long, help = "Records requested per page; overrides the config")]
    pub page_size: Option<usize>,

    #[arg(long, help = "Walker settings file (JSON)")]
    pub config: Option<String>,
}
