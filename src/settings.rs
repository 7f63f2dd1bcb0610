use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use songbook_core::{OutputVariant, RenderError, RenderOptions, Substitutions};

/// 未在命令行指定时读取的配置文件名。
pub const DEFAULT_SETTINGS_FILE: &str = "songbook.toml";

/// 一首歌曲的输入文件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongSource {
    /// 歌曲模型的 JSON 文件。
    pub model: PathBuf,
    /// 原始源文件。用于 `{{SRC}}`、输出文件名和语言回退；缺失时使用模型文件。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl SongSource {
    /// 标识这首歌曲的文件。
    #[must_use]
    pub fn identity(&self) -> &Path {
        self.source.as_deref().unwrap_or(&self.model)
    }
}

/// 注入到每个文档中的外部片段文件。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// 默认日志指令，例如 `info` 或 `info,song_markup=debug`。
    pub log_level: String,
    /// 计算 `{{SRC}}` 相对路径时使用的歌曲根目录。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub songs_root: Option<PathBuf>,
    /// 该目录下所有 `.json` 文件都会作为歌曲模型加入。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub songs_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub variants: Vec<OutputVariant>,
    /// 是否按歌曲并行渲染。
    pub parallel: bool,
    pub fragments: FragmentSettings,
    pub substitutions: Substitutions,
    pub render: RenderOptions,
    pub songs: Vec<SongSource>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            songs_root: None,
            songs_dir: None,
            output_dir: PathBuf::from("out"),
            variants: vec![OutputVariant::Web],
            parallel: true,
            fragments: FragmentSettings::default(),
            substitutions: Substitutions::default(),
            render: RenderOptions::default(),
            songs: Vec::new(),
        }
    }
}

impl AppSettings {
    /// 读取配置文件。文件不存在时写入并返回默认配置。
    ///
    /// 配置中的相对路径以配置文件所在目录为基准。
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        if !path.exists() {
            let defaults = Self::default();
            defaults.save(path)?;
            return Ok(defaults);
        }

        let content = fs::read_to_string(path)?;
        let mut settings: Self = toml::from_str(&content)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            settings.resolve_paths(base);
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        resolve(&mut self.output_dir);
        let optional = [
            &mut self.songs_root,
            &mut self.songs_dir,
            &mut self.fragments.head,
            &mut self.fragments.prefix,
            &mut self.fragments.suffix,
        ];
        for path in optional.into_iter().flatten() {
            resolve(path);
        }
        for song in &mut self.songs {
            resolve(&mut song.model);
            if let Some(source) = song.source.as_mut() {
                resolve(source);
            }
        }
    }

    /// 配置中列出的歌曲，加上 `songs_dir` 中按文件名排序的 `.json` 文件。
    pub fn song_sources(&self) -> Result<Vec<SongSource>, RenderError> {
        let mut sources = self.songs.clone();
        if let Some(dir) = &self.songs_dir {
            let mut found: Vec<PathBuf> = fs::read_dir(dir)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<_, _>>()?;
            found.retain(|path| path.extension().is_some_and(|ext| ext == "json"));
            found.sort();
            sources.extend(found.into_iter().map(|model| SongSource {
                model,
                source: None,
            }));
        }
        Ok(sources)
    }

    /// 某种格式的输出目录。多种格式时各自写入以格式命名的子目录。
    #[must_use]
    pub fn output_dir_for(&self, variant: OutputVariant) -> PathBuf {
        if self.variants.len() > 1 {
            self.output_dir.join(variant.to_string())
        } else {
            self.output_dir.clone()
        }
    }
}
