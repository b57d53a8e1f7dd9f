//! List declared routes

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::output::{print_list, CatalogRow, OutputFormat};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Catalog files or directories (default: ./specs)
    pub paths: Vec<PathBuf>,

    /// Only catalogs carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,
}

pub fn execute(args: ListArgs, format: OutputFormat) -> Result<i32> {
    let catalogs = super::select(super::load_catalogs(&args.paths)?, args.tag.as_deref(), &[]);
    let rows: Vec<CatalogRow> = catalogs.iter().flat_map(CatalogRow::rows).collect();
    print_list(&rows, format);
    Ok(0)
}
