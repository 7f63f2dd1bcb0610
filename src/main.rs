mod logger;
mod settings;

use std::{env, path::PathBuf, process::ExitCode};

use song_markup::{BatchOptions, SongEntry, SongTemplates, converter_for, load_song_json, render_batch};
use songbook_core::RenderError;

use settings::{AppSettings, DEFAULT_SETTINGS_FILE};

fn main() -> ExitCode {
    let settings_path = env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE), PathBuf::from);

    let settings = match AppSettings::load(&settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("无法加载配置文件 {}: {e}", settings_path.display());
            return ExitCode::FAILURE;
        }
    };

    logger::init_logger(&settings.log_level);
    tracing::info!("[Settings] 已从 {} 加载配置。", settings_path.display());

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("渲染失败: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &AppSettings) -> Result<(), RenderError> {
    let templates = SongTemplates::load(
        settings.fragments.head.as_deref(),
        settings.fragments.prefix.as_deref(),
        settings.fragments.suffix.as_deref(),
    )?;

    let entries = settings
        .song_sources()?
        .into_iter()
        .map(|source| {
            let song = load_song_json(&source.model)?;
            Ok(SongEntry::new(song).with_source(source.identity()))
        })
        .collect::<Result<Vec<_>, RenderError>>()?;

    if entries.is_empty() {
        tracing::warn!("配置中没有任何歌曲，未生成文件。");
        return Ok(());
    }

    for &variant in &settings.variants {
        let converter = converter_for(variant, settings.render.clone());
        let output_dir = settings.output_dir_for(variant);
        render_batch(
            converter.as_ref(),
            &entries,
            &templates,
            &settings.substitutions,
            BatchOptions {
                output_dir: &output_dir,
                songs_root: settings.songs_root.as_deref(),
                parallel: settings.parallel,
            },
        )?;
    }

    Ok(())
}
