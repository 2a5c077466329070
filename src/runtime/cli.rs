use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::parse_track_id;
use crate::upload::UploadRequest;

/// Stream, like and publish tracks from a shared catalogue.
#[derive(Parser, Debug)]
#[command(name = "bahr", version, about, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Share link (or `?id=...`) of a track to select once the list loads.
    #[arg(value_parser = track_id_from_link, conflicts_with = "id")]
    link: Option<String>,

    /// Track id to select once the list loads.
    #[arg(long, value_parser = non_blank)]
    id: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Publish an audio file to the catalogue.
    Upload(UploadArgs),
    /// Print the effective settings with secrets masked.
    PrintConfig,
}

#[derive(Args, Debug, PartialEq)]
pub struct UploadArgs {
    /// Audio file to publish.
    file: PathBuf,
    /// Defaults to the file's title tag, then its name.
    #[arg(long)]
    title: Option<String>,
    /// Defaults to the file's artist tag.
    #[arg(long)]
    artist: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

impl Cli {
    /// The track to resume, from either `--id` or a share link.
    pub fn deep_link(&self) -> Option<String> {
        self.id.clone().or_else(|| self.link.clone())
    }
}

impl UploadArgs {
    pub fn into_request(self) -> UploadRequest {
        UploadRequest {
            path: self.file,
            title: self.title,
            artist: self.artist,
            genre: self.genre,
            description: self.description,
        }
    }
}

fn track_id_from_link(link: &str) -> Result<String, String> {
    parse_track_id(link).ok_or_else(|| format!("no track id in {link:?}"))
}

fn non_blank(value: &str) -> Result<String, String> {
    match value.trim() {
        "" => Err("track id is empty".to_string()),
        id => Ok(id.to_string()),
    }
}
