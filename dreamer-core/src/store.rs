//! File-backed storage of episodes.
//!
//! Each episode is one zip archive in the store directory, named
//! `pre_{index:06}.zip` for prefill episodes and `{index:06}.zip` otherwise.
//! An archive has the deflate-compressed entries
//!
//! * `obs`, `act`, `reward`: bincode-encoded ndarray arrays,
//! * `meta`: [`EpisodeMeta`] in YAML.
//!
//! Archives are written to a hidden temporary file in the same directory and
//! renamed when complete, so readers never observe partial episodes.
use crate::{
    error::DreamerError,
    episode::{Episode, EpisodeKind, EpisodeMeta},
};
use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info};
use ndarray::{Array1, Array2, Array4};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

const OBS: &str = "obs";
const ACT: &str = "act";
const REWARD: &str = "reward";
const META: &str = "meta";
const PREFILL_PREFIX: &str = "pre_";

/// Append-only directory of episode archives.
pub struct TrajectoryStore {
    dir: PathBuf,
    next_index: u64,
}

/// File name of the episode with the given kind and index.
fn file_name(kind: EpisodeKind, index: u64) -> String {
    match kind {
        EpisodeKind::Prefill => format!("{}{:06}.zip", PREFILL_PREFIX, index),
        EpisodeKind::Regular => format!("{:06}.zip", index),
    }
}

/// Parses the kind and index from the file name of an episode archive.
pub(crate) fn parse_file_name(name: &str) -> Result<(EpisodeKind, u64), DreamerError> {
    let invalid = || DreamerError::InvalidEpisodeFileName(name.to_string());
    let stem = name.strip_suffix(".zip").ok_or_else(invalid)?;
    let (kind, digits) = match stem.strip_prefix(PREFILL_PREFIX) {
        Some(digits) => (EpisodeKind::Prefill, digits),
        None => (EpisodeKind::Regular, stem),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let index = digits.parse().map_err(|_| invalid())?;
    Ok((kind, index))
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

fn write_archive(path: &Path, episode: &Episode, meta: &EpisodeMeta) -> Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(OBS, options)?;
    bincode::serialize_into(&mut zip, episode.obs())?;
    zip.start_file(ACT, options)?;
    bincode::serialize_into(&mut zip, episode.act())?;
    zip.start_file(REWARD, options)?;
    bincode::serialize_into(&mut zip, episode.reward())?;
    zip.start_file(META, options)?;
    zip.write_all(serde_yaml::to_string(meta)?.as_bytes())?;

    let mut writer = zip.finish()?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

impl TrajectoryStore {
    /// Opens the store in `dir`, creating the directory if needed.
    ///
    /// Indices of new episodes continue after the largest index found in
    /// the directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create episode directory {:?}", dir))?;

        let next_index = Self::list_dir(&dir)?
            .iter()
            .map(|(_, index, _)| index + 1)
            .max()
            .unwrap_or(0);
        info!(
            "Opened episode store {:?}, next episode index is {}",
            dir, next_index
        );

        Ok(Self { dir, next_index })
    }

    /// Directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Index assigned to the next saved episode.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Writes an episode and returns the path of its archive.
    pub fn save(&mut self, episode: &Episode, kind: EpisodeKind) -> Result<PathBuf> {
        let index = self.next_index;
        let name = file_name(kind, index);
        let path = self.dir.join(&name);
        let tmp_path = self.dir.join(format!(".{}.tmp", name));
        let meta = EpisodeMeta {
            index,
            kind,
            length: episode.len(),
            total_reward: episode.total_reward(),
            created_at: Local::now().to_rfc3339(),
        };

        if let Err(e) = write_archive(&tmp_path, episode, &meta) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.context(format!("Failed to write episode {:?}", path)));
        }
        fs::rename(&tmp_path, &path)?;
        self.next_index += 1;
        debug!("Saved episode {:?} ({} steps)", path, episode.len());

        Ok(path)
    }

    /// Reads an episode archive.
    pub fn load(path: impl AsRef<Path>) -> Result<Episode> {
        let mut archive = open_archive(path.as_ref())?;
        let obs: Array4<f32> = bincode::deserialize_from(archive.by_name(OBS)?)?;
        let act: Array2<f32> = bincode::deserialize_from(archive.by_name(ACT)?)?;
        let reward: Array1<f32> = bincode::deserialize_from(archive.by_name(REWARD)?)?;
        Ok(Episode::new(obs, act, reward)?)
    }

    /// Reads only the metadata of an episode archive.
    pub fn load_meta(path: impl AsRef<Path>) -> Result<EpisodeMeta> {
        let mut archive = open_archive(path.as_ref())?;
        let meta = serde_yaml::from_reader(archive.by_name(META)?)?;
        Ok(meta)
    }

    /// Paths of the stored episodes in the order of their indices.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        Self::list_paths(&self.dir)
    }

    /// Paths of the episode archives in `dir` in the order of their indices.
    ///
    /// Temporary files and files not following the naming scheme are skipped.
    pub fn list_paths(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        Ok(Self::list_dir(dir.as_ref())?
            .into_iter()
            .map(|(_, _, path)| path)
            .collect())
    }

    fn list_dir(dir: &Path) -> Result<Vec<(EpisodeKind, u64, PathBuf)>> {
        let mut entries = vec![];
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match parse_file_name(&name) {
                Ok((kind, index)) => entries.push((kind, index, entry.path())),
                Err(_) => debug!("Skipped {:?} in episode directory", name),
            }
        }
        entries.sort_by_key(|(_, index, _)| *index);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;
    use tempdir::TempDir;

    fn episode(len: usize, offset: f32) -> Episode {
        let obs = Array::from_shape_fn((len, 3, 4, 4), |(t, c, h, w)| {
            offset + (t * 1000 + c * 100 + h * 10 + w) as f32 / 7.0
        });
        let act = Array::from_shape_fn((len, 2), |(t, a)| (t as f32).sin() - a as f32 * 0.1);
        let reward = Array::from_shape_fn(len, |t| if t + 1 == len { 1.0 } else { 1e-7 });
        Episode::new(obs, act, reward).unwrap()
    }

    #[test]
    fn test_save_and_load_are_bit_identical() -> Result<()> {
        let dir = TempDir::new("store")?;
        let mut store = TrajectoryStore::new(dir.path())?;
        let ep = episode(7, -0.5);
        let path = store.save(&ep, EpisodeKind::Regular)?;
        let loaded = TrajectoryStore::load(&path)?;

        let bits = |xs: &[f32]| xs.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(
            bits(ep.obs().as_slice().unwrap()),
            bits(loaded.obs().as_slice().unwrap())
        );
        assert_eq!(
            bits(ep.act().as_slice().unwrap()),
            bits(loaded.act().as_slice().unwrap())
        );
        assert_eq!(
            bits(ep.reward().as_slice().unwrap()),
            bits(loaded.reward().as_slice().unwrap())
        );

        let meta = TrajectoryStore::load_meta(&path)?;
        assert_eq!(meta.index, 0);
        assert_eq!(meta.kind, EpisodeKind::Regular);
        assert_eq!(meta.length, 7);
        assert_eq!(meta.total_reward, ep.total_reward());
        Ok(())
    }

    #[test]
    fn test_names_and_resumed_index() -> Result<()> {
        let dir = TempDir::new("store")?;
        {
            let mut store = TrajectoryStore::new(dir.path())?;
            let p0 = store.save(&episode(3, 0.0), EpisodeKind::Prefill)?;
            let p1 = store.save(&episode(3, 0.0), EpisodeKind::Prefill)?;
            let p2 = store.save(&episode(3, 0.0), EpisodeKind::Regular)?;
            assert!(p0.ends_with("pre_000000.zip"));
            assert!(p1.ends_with("pre_000001.zip"));
            assert!(p2.ends_with("000002.zip"));
        }

        // Leftovers of an interrupted write and unrelated files are ignored
        fs::write(dir.path().join(".000003.zip.tmp"), b"partial")?;
        fs::write(dir.path().join("notes.txt"), b"")?;

        let mut store = TrajectoryStore::new(dir.path())?;
        assert_eq!(store.next_index(), 3);
        let p3 = store.save(&episode(2, 0.0), EpisodeKind::Regular)?;
        assert!(p3.ends_with("000003.zip"));

        let listed = store.list()?;
        assert_eq!(listed.len(), 4);
        assert_eq!(listed[3], p3);
        Ok(())
    }

    #[test]
    fn test_new_fails_on_file() -> Result<()> {
        let dir = TempDir::new("store")?;
        let file = dir.path().join("not_a_dir");
        fs::write(&file, b"")?;
        assert!(TrajectoryStore::new(&file).is_err());
        Ok(())
    }

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name("pre_000012.zip"),
            Ok((EpisodeKind::Prefill, 12))
        );
        assert_eq!(parse_file_name("000120.zip"), Ok((EpisodeKind::Regular, 120)));
        assert!(parse_file_name(".000001.zip.tmp").is_err());
        assert!(parse_file_name("pre_.zip").is_err());
        assert!(parse_file_name("x01.zip").is_err());
    }
}
