// Training statistics and the writers they are reported through
use crate::error::Result;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Mean of every value recorded under a tag since the last write.
pub type StatsSummary = BTreeMap<String, f32>;

pub struct StatsReporter {
    stats: BTreeMap<String, Vec<f32>>,
    writers: Vec<Box<dyn StatsWriter>>,
}

impl Default for StatsReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsReporter {
    pub fn new() -> Self {
        Self {
            stats: BTreeMap::new(),
            writers: Vec::new(),
        }
    }

    pub fn add_writer(&mut self, writer: Box<dyn StatsWriter>) {
        self.writers.push(writer);
    }

    pub fn add_stat(&mut self, key: &str, value: f32) {
        self.stats.entry(key.to_string()).or_default().push(value);
    }

    pub fn get_stats(&self, key: &str) -> Option<&Vec<f32>> {
        self.stats.get(key)
    }

    pub fn summary(&self) -> StatsSummary {
        self.stats
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(k, values)| (k.clone(), values.iter().sum::<f32>() / values.len() as f32))
            .collect()
    }

    /// Send the current summary to every writer and start a new window.
    pub fn write_stats(&mut self, step: u64) -> Result<StatsSummary> {
        let summary = self.summary();
        for writer in &mut self.writers {
            writer.write(&summary, step)?;
        }
        self.stats.clear();
        Ok(summary)
    }
}

pub trait StatsWriter: Send {
    fn write(&mut self, summary: &StatsSummary, step: u64) -> Result<()>;
}

/// Reports each summary as a single `info` log line.
pub struct LogWriter;

impl StatsWriter for LogWriter {
    fn write(&mut self, summary: &StatsSummary, step: u64) -> Result<()> {
        let line = summary
            .iter()
            .map(|(k, v)| format!("{}: {:.4}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        log::info!("Epoch {}: {}", step, line);
        Ok(())
    }
}

/// One `<tag>.csv` file per statistic with `step,value` rows.
pub struct CsvWriter {
    log_dir: PathBuf,
}

impl CsvWriter {
    pub fn new(log_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        Ok(Self {
            log_dir: log_dir.to_path_buf(),
        })
    }

    pub fn path_for(&self, tag: &str) -> PathBuf {
        self.log_dir.join(format!("{}.csv", tag.replace('/', "_")))
    }
}

impl StatsWriter for CsvWriter {
    fn write(&mut self, summary: &StatsSummary, step: u64) -> Result<()> {
        for (tag, value) in summary {
            let file_path = self.path_for(tag);
            let file_exists = file_path.exists();
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file_path)?;
            if !file_exists {
                writeln!(file, "step,value")?;
            }
            writeln!(file, "{},{}", step, value)?;
        }
        Ok(())
    }
}
