//! Snapshots of the model state handed to output collaborators

use {
    crate::error::Result,
    chrono::NaiveDateTime,
    log::info,
    ndarray::Array2,
    serde::{Deserialize, Serialize},
    std::{
        fs::File,
        io::{BufWriter, Write},
        path::{Path, PathBuf},
    },
};

/// Part of the flow a snapshot field is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Mean,
    Perturbation,
    Total,
}

/// Fields included in each snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection {
    pub winds: Component,
    pub vorticity: Component,
    pub streamfunction: Component,
    /// Include the external forcing (if any)
    pub forcing: bool,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self {
            winds: Component::Total,
            vorticity: Component::Total,
            streamfunction: Component::Perturbation,
            forcing: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Whole hours since the start
    pub hour: u64,
    pub time: NaiveDateTime,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub selection: FieldSelection,

    pub u: Array2<f64>,
    pub v: Array2<f64>,
    pub vorticity: Array2<f64>,
    pub streamfunction: Array2<f64>,
    /// Height proxy psi * Omega / g (m) of the selected streamfunction
    pub height: Array2<f64>,
    pub topography: Array2<f64>,
    pub forcing: Option<Array2<f64>>,
}

/// Consumer of model snapshots
pub trait SnapshotSink {
    fn emit(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Keeps every snapshot in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub snapshots: Vec<Snapshot>,
}

impl SnapshotSink for MemorySink {
    fn emit(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

/// Writes each snapshot to `snapshot_HHH.bin` with bincode
#[derive(Debug)]
pub struct BinaryWriter {
    directory: PathBuf,
}

impl BinaryWriter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, hour: u64) -> PathBuf {
        self.directory.join(format!("snapshot_{:03}.bin", hour))
    }

    pub fn read(path: &Path) -> Result<Snapshot> {
        Ok(bincode::deserialize_from(File::open(path)?)?)
    }
}

impl SnapshotSink for BinaryWriter {
    fn emit(&mut self, snapshot: &Snapshot) -> Result<()> {
        let path = self.path(snapshot.hour);
        let mut writer = BufWriter::new(File::create(&path)?);
        bincode::serialize_into(&mut writer, snapshot)?;
        writer.flush()?;
        info!("Wrote snapshot for hour {} to {}", snapshot.hour, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use {super::*, chrono::NaiveDate, tempdir::TempDir};

    fn snapshot(hour: u64) -> Snapshot {
        let field = Array2::from_shape_fn((3, 4), |(j, i)| (j * 4 + i) as f64);
        Snapshot {
            hour,
            time: NaiveDate::from_ymd_opt(2017, 1, 1)
                .and_then(|date| date.and_hms_opt(hour as u32, 0, 0))
                .unwrap(),
            lats: vec![60.0, 0.0, -60.0],
            lons: vec![0.0, 90.0, 180.0, 270.0],
            selection: FieldSelection::default(),
            u: field.clone(),
            v: -&field,
            vorticity: &field * 1.0E-5,
            streamfunction: &field * 1.0E6,
            height: &field * 7.0,
            topography: Array2::zeros((3, 4)),
            forcing: None,
        }
    }

    #[test]
    fn memory_sink_keeps_snapshots() {
        let mut sink = MemorySink::default();
        sink.emit(&snapshot(0)).unwrap();
        sink.emit(&snapshot(6)).unwrap();

        assert_eq!(
            vec![0, 6],
            sink.snapshots.iter().map(|s| s.hour).collect::<Vec<u64>>()
        );
    }

    #[test]
    fn binary_writer_output() {
        let dir = TempDir::new("snapshots").unwrap();
        let mut writer = BinaryWriter::new(dir.path());

        writer.emit(&snapshot(12)).unwrap();

        let path = dir.path().join("snapshot_012.bin");
        assert_eq!(path, writer.path(12));
        assert_eq!(snapshot(12), BinaryWriter::read(&path).unwrap());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new("snapshots").unwrap();
        let mut writer = BinaryWriter::new(dir.path().join("absent"));

        assert!(writer.emit(&snapshot(0)).is_err());
    }
}
