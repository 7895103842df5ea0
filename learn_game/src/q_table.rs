use crate::board::NUM_CELLS;
use crate::players::Marks;
use anyhow::Context;
use chrono::offset::Local;
use itertools::Itertools;
use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

/// Action values of one state, indexed by cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Moves {
    pub moves: [f32; NUM_CELLS],
}

/// State key to per-cell action values. Entries appear on first touch, all zero.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(transparent)]
pub struct QTable {
    qtable: HashMap<String, Moves>,
}

impl Deref for Moves {
    type Target = [f32; NUM_CELLS];
    fn deref(&self) -> &Self::Target {
        &self.moves
    }
}

impl DerefMut for Moves {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.moves
    }
}

impl Deref for QTable {
    type Target = HashMap<String, Moves>;
    fn deref(&self) -> &Self::Target {
        &self.qtable
    }
}

impl DerefMut for QTable {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.qtable
    }
}

impl From<[f32; NUM_CELLS]> for Moves {
    fn from(moves: [f32; NUM_CELLS]) -> Self {
        Moves { moves }
    }
}

impl Moves {
    pub fn max_value(&self) -> f32 {
        self.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Every move in `legal` sharing the highest value, in the order given. Indices
    /// past the last cell are skipped.
    pub fn max_moves(&self, legal: &[usize]) -> Vec<usize> {
        legal
            .iter()
            .copied()
            .filter(|&a| a < NUM_CELLS)
            .max_set_by(|&a, &b| self[a].total_cmp(&self[b]))
    }
}

impl QTable {
    pub fn new() -> Self {
        QTable {
            qtable: HashMap::with_capacity(6000),
        }
    }

    /// Lookup-or-insert: unseen states get a zeroed row.
    pub fn moves_mut(&mut self, state_key: &str) -> &mut Moves {
        self.qtable.entry(state_key.to_owned()).or_default()
    }

    /// Value of `(state_key, action)` without inserting anything.
    pub fn value(&self, state_key: &str, action: usize) -> f32 {
        self.qtable
            .get(state_key)
            .and_then(|moves| moves.get(action).copied())
            .unwrap_or(0.0)
    }

    /// One-step temporal-difference update of `(current_state_key, action)`.
    ///
    /// Terminal updates move toward `reward`; the others toward
    /// `reward + discount_rate * max(next state values)`.
    pub fn update_q_table(
        &mut self,
        current_state_key: &str,
        next_state_key: &str,
        action: usize,
        reward: f32,
        game_over: bool,
        learning_rate: f32,
        discount_rate: f32,
    ) {
        let next_max = self.moves_mut(next_state_key).max_value();
        let expected = if game_over {
            reward
        } else {
            reward + discount_rate * next_max
        };
        let value = &mut self.moves_mut(current_state_key)[action];
        *value += learning_rate * (expected - *value);
    }
}

impl Serialize for Moves {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(NUM_CELLS))?;
        for value in self.iter() {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Moves {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MovesVisitor;

        impl<'de> Visitor<'de> for MovesVisitor {
            type Value = Moves;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a list of {NUM_CELLS} action values")
            }
            fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut moves = [0.0_f32; NUM_CELLS];
                let mut count = 0;
                // integers are accepted as well as floats
                while let Some(value) = access.next_element::<f64>()? {
                    if count == NUM_CELLS {
                        return Err(serde::de::Error::invalid_length(count + 1, &self));
                    }
                    moves[count] = value as f32;
                    count += 1;
                }
                if count != NUM_CELLS {
                    return Err(serde::de::Error::invalid_length(count, &self));
                }
                Ok(Moves { moves })
            }
        }

        deserializer.deserialize_seq(MovesVisitor)
    }
}

fn create_file(path: &Path) -> anyhow::Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// File name of the pickled table for `mark`.
pub fn q_table_file_name(mark: Marks) -> String {
    format!("q_table_{}.pickle", mark.as_char().to_ascii_lowercase())
}

pub fn q_table_to_disk(path: &Path, q: &QTable) -> anyhow::Result<()> {
    let mut file = create_file(path)?;
    serde_pickle::to_writer(&mut file, q, serde_pickle::SerOptions::new())
        .with_context(|| format!("writing {}", path.display()))?;
    file.flush()?;
    Ok(())
}

pub fn q_table_from_disk_pickle(path: &Path) -> anyhow::Result<QTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let decoded = serde_pickle::from_reader(BufReader::new(file), serde_pickle::DeOptions::new())
        .with_context(|| format!("decoding {}", path.display()))?;
    Ok(decoded)
}

pub fn q_table_to_disk_json(path: &Path, q: &QTable) -> anyhow::Result<()> {
    let mut file = create_file(path)?;
    serde_json::to_writer(&mut file, q).with_context(|| format!("writing {}", path.display()))?;
    file.flush()?;
    Ok(())
}

pub fn q_table_from_disk_json(path: &Path) -> anyhow::Result<QTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let decoded = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("decoding {}", path.display()))?;
    Ok(decoded)
}

/// Loads the pickled table at `path`. A missing or unreadable file gives an empty table.
pub fn q_table_load_or_empty(path: &Path) -> QTable {
    if !path.exists() {
        log::debug!("no saved table at {}, starting empty", path.display());
        return QTable::new();
    }
    match q_table_from_disk_pickle(path) {
        Ok(q) => {
            log::info!("loaded {} states from {}", q.len(), path.display());
            q
        }
        Err(e) => {
            log::warn!("ignoring unreadable table: {e:#}");
            QTable::new()
        }
    }
}

/// Writes a dated JSON snapshot `qtable-<mark>-<date>.json` into `dir`.
pub fn q_table_archive(dir: &Path, mark: Marks, q: &QTable) -> anyhow::Result<PathBuf> {
    let today = Local::now().date_naive();
    let filename = format!(
        "qtable-{}-{}.json",
        mark.as_char().to_ascii_lowercase(),
        today
    );
    let path: PathBuf = [dir, Path::new(&filename)].iter().collect();
    q_table_to_disk_json(&path, q)?;
    Ok(path)
}
