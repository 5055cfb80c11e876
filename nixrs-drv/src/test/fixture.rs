use std::collections::BTreeMap;

use tempfile::TempDir;

use crate::derivation::{Derivation, DerivationOutput, NAME_VAR};
use crate::store_path::{StoreDir, StorePath};

/// A throw-away store directory on disk.
pub struct StoreFixture {
    _dir: TempDir,
    store_dir: StoreDir,
}

impl StoreFixture {
    pub fn new() -> StoreFixture {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = StoreDir::new(dir.path()).unwrap();
        StoreFixture {
            _dir: dir,
            store_dir,
        }
    }

    pub fn store_dir(&self) -> &StoreDir {
        &self.store_dir
    }

    pub fn path(&self, base_name: &str) -> StorePath {
        self.store_dir.resolve(base_name).unwrap()
    }

    pub fn write(&self, base_name: &str, contents: &str) -> StorePath {
        let path = self.path(base_name);
        std::fs::write(self.store_dir.local_path(&path), contents).unwrap();
        path
    }

    pub fn add_drv(&self, drv: &Derivation) {
        std::fs::write(self.store_dir.local_path(&drv.path), drv.to_aterm()).unwrap();
    }

    /// Make a build output exist locally.
    pub fn add_output(&self, path: &StorePath) {
        std::fs::create_dir_all(self.store_dir.local_path(path)).unwrap();
    }

    pub fn remove(&self, path: &StorePath) {
        std::fs::remove_file(self.store_dir.local_path(path)).unwrap();
    }
}

pub struct DrvBuilder(Derivation);

pub fn drv(path: StorePath, name: &str) -> DrvBuilder {
    DrvBuilder(Derivation {
        path,
        outputs: BTreeMap::new(),
        input_derivations: BTreeMap::new(),
        input_files: Default::default(),
        system: "x86_64-linux".into(),
        builder: "/bin/sh".into(),
        builder_args: vec!["-e".into(), "build.sh".into()],
        environment: BTreeMap::from([(NAME_VAR.to_string(), name.to_string())]),
    })
}

impl DrvBuilder {
    pub fn output(mut self, name: &str, path: StorePath) -> Self {
        self.0
            .outputs
            .insert(name.parse().unwrap(), DerivationOutput::Plain(path));
        self
    }

    pub fn fixed_output(mut self, name: &str, path: StorePath, hash: &str) -> Self {
        self.0.outputs.insert(
            name.parse().unwrap(),
            DerivationOutput::FixedOutput {
                path,
                hash_algo: "sha256".into(),
                hash: hash.into(),
            },
        );
        self
    }

    pub fn input_drv(mut self, path: &StorePath, outputs: &[&str]) -> Self {
        self.0.input_derivations.insert(
            path.clone(),
            outputs.iter().map(|o| o.parse().unwrap()).collect(),
        );
        self
    }

    pub fn input_file(mut self, path: StorePath) -> Self {
        self.0.input_files.insert(path);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.0.environment.insert(key.into(), value.into());
        self
    }

    pub fn system(mut self, system: &str) -> Self {
        self.0.system = system.into();
        self
    }

    pub fn builder(mut self, builder: &str) -> Self {
        self.0.builder = builder.into();
        self
    }

    pub fn build(self) -> Derivation {
        self.0
    }
}
