use clap::{Args, Parser, Subcommand};
use photo_import_config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Import photos from a memory card into a dated folder tree", long_about = None)]
pub struct Cli {
    /// Configuration file; defaults to the platform configuration directory
    #[arg(long, global = true, env = "PHOTO_IMPORT_CONFIG")]
    pub config: Option<PathBuf>,
    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy (or convert) photos into the destination
    Import(ImportArgs),
    /// List the importable photos below a directory
    List {
        source: PathBuf,
    },
    /// Report which external tools were found
    Probe,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Files or directories to import; directories are searched recursively
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,
    /// Destination root, overriding `import.location`
    #[arg(short, long)]
    pub destination: Option<PathBuf>,
    /// Sub-folder pattern: none, yyyymmdd, yymmdd, ddmmyy, ddmm, yyyyddmmm, ddmmmyyyy or custom
    #[arg(short, long)]
    pub pattern: Option<String>,
    /// Folder name for the custom pattern, may use {{ year }}, {{ month }}, ...
    #[arg(long)]
    pub custom_name: Option<String>,
    /// Convert RAW files to DNG
    #[arg(long, conflicts_with = "no_dng")]
    pub dng: bool,
    /// Copy RAW files as they are, even if the configuration converts them
    #[arg(long)]
    pub no_dng: bool,
    /// Delete originals once they have been imported and verified
    #[arg(long, conflicts_with = "keep_original")]
    pub delete_original: bool,
    /// Keep originals, even if the configuration deletes them
    #[arg(long)]
    pub keep_original: bool,
    /// Files transferred at the same time
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,
    /// What to do when a conversion fails: fail or copy
    #[arg(long)]
    pub fallback: Option<String>,
}

impl ImportArgs {
    /// Overrides `config` with whatever was given on the command line.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(pattern) = &self.pattern {
            config.import.sub_folder_pattern = pattern.clone();
        }
        if self.custom_name.is_some() {
            config.import.custom_sub_folder_name = self.custom_name.clone();
        }
        if self.dng {
            config.import.convert_to_dng = true;
        }
        if self.no_dng {
            config.import.convert_to_dng = false;
        }
        if self.delete_original {
            config.import.delete_original = true;
        }
        if self.keep_original {
            config.import.delete_original = false;
        }
        if let Some(concurrency) = self.concurrency {
            config.engine.concurrency = concurrency;
        }
        if let Some(fallback) = &self.fallback {
            config.engine.conversion_fallback = fallback.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn import_args(args: &[&str]) -> ImportArgs {
        let cli = Cli::try_parse_from(["photo-import", "import"].into_iter().chain(args.iter().copied())).unwrap();
        match cli.command {
            Commands::Import(args) => args,
            _ => unreachable!(),
        }
    }

    #[rstest]
    #[case(false, &[], false)]
    #[case(true, &[], true)]
    #[case(false, &["--delete-original"], true)]
    #[case(true, &["--keep-original"], false)]
    fn test_delete_original_override(#[case] configured: bool, #[case] flags: &[&str], #[case] expected: bool) {
        let mut config = Config::default();
        config.import.delete_original = configured;
        let args: Vec<_> = flags.iter().copied().chain(["/card"]).collect();
        import_args(&args).apply_to(&mut config);
        assert_eq!(config.import.delete_original, expected);
    }

    #[test]
    fn test_conflicting_flags() {
        let parsed = Cli::try_parse_from(["photo-import", "import", "--delete-original", "--keep-original", "/card"]);
        assert!(parsed.is_err());
        assert!(Cli::try_parse_from(["photo-import", "import", "--dng", "--no-dng", "/card"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        import_args(&["-p", "ddmm", "--dng", "-j", "2", "--fallback", "copy", "/card"]).apply_to(&mut config);
        assert_eq!(config.import.sub_folder_pattern, "ddmm");
        assert!(config.import.convert_to_dng);
        assert_eq!(config.engine.concurrency, 2);
        assert_eq!(config.engine.conversion_fallback, "copy");
    }
}
