use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::derivation::Derivation;
use crate::store::DerivationStore;
use crate::store_path::{StorePath, StorePathSet};
use crate::{Error, Result};

struct Frame {
    path: StorePath,
    inputs: Vec<Arc<Derivation>>,
    next: usize,
}

/// Computes build closures on top of a [`DerivationStore`].
///
/// The resolver remembers which derivations are already known to have an
/// acyclic input graph, so asking about many derivations sharing inputs only
/// walks each part of the graph once.
pub struct Resolver<'s> {
    store: &'s DerivationStore,
    acyclic: Mutex<HashSet<StorePath>>,
}

impl<'s> Resolver<'s> {
    pub fn new(store: &'s DerivationStore) -> Resolver<'s> {
        Resolver {
            store,
            acyclic: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &'s DerivationStore {
        self.store
    }

    /// Store paths needed to build `drv`.
    ///
    /// These are its input files plus the requested outputs of each
    /// derivation it refers to. Outputs of those derivations' own inputs are
    /// not included, see [`requisites`](Self::requisites) for that.
    #[instrument(skip_all, fields(drv = %drv.path))]
    pub async fn closure(&self, drv: &Derivation) -> Result<StorePathSet> {
        self.check_acyclic(drv).await?;
        self.direct_closure(drv).await
    }

    /// Union of [`closure`](Self::closure) over `drv` and every derivation
    /// reachable from it.
    #[instrument(skip_all, fields(drv = %drv.path))]
    pub async fn requisites(&self, drv: &Derivation) -> Result<StorePathSet> {
        self.check_acyclic(drv).await?;
        let mut seen = HashSet::from([drv.path.clone()]);
        let mut requisites = self.direct_closure(drv).await?;
        let mut level = self.store.load_many(drv.input_derivations.keys()).await?;
        while !level.is_empty() {
            let mut next = StorePathSet::new();
            for input in &level {
                if seen.insert(input.path.clone()) {
                    requisites.extend(self.direct_closure(input).await?);
                    next.extend(input.input_derivations.keys().cloned());
                }
            }
            level = self.store.load_many(&next).await?;
        }
        debug!(derivations = seen.len(), paths = requisites.len(), "resolved requisites");
        Ok(requisites)
    }

    async fn direct_closure(&self, drv: &Derivation) -> Result<StorePathSet> {
        let mut closure = drv.input_files.clone();
        let inputs = self.store.load_many(drv.input_derivations.keys()).await?;
        for (input, outputs) in inputs.iter().zip(drv.input_derivations.values()) {
            for output in outputs {
                let path = input
                    .output_path(output)
                    .ok_or_else(|| Error::MissingOutput {
                        drv_path: input.path.clone(),
                        output: output.clone(),
                    })?;
                closure.insert(path.clone());
            }
        }
        Ok(closure)
    }

    /// Depth first walk over the input derivations of `root` failing on the
    /// first derivation found on its own input path.
    async fn check_acyclic(&self, root: &Derivation) -> Result<()> {
        if self.acyclic.lock().contains(&root.path) {
            return Ok(());
        }
        let mut on_stack = HashSet::from([root.path.clone()]);
        let mut done = HashSet::new();
        let mut stack = vec![Frame {
            path: root.path.clone(),
            inputs: self.store.load_many(root.input_derivations.keys()).await?,
            next: 0,
        }];
        while let Some(frame) = stack.last_mut() {
            let Some(input) = frame.inputs.get(frame.next).cloned() else {
                if let Some(frame) = stack.pop() {
                    on_stack.remove(&frame.path);
                    done.insert(frame.path);
                }
                continue;
            };
            frame.next += 1;
            if on_stack.contains(&input.path) {
                return Err(Error::Cycle {
                    path: input.path.clone(),
                });
            }
            if done.contains(&input.path) || self.acyclic.lock().contains(&input.path) {
                continue;
            }
            let inputs = self.store.load_many(input.input_derivations.keys()).await?;
            on_stack.insert(input.path.clone());
            stack.push(Frame {
                path: input.path.clone(),
                inputs,
                next: 0,
            });
        }
        self.acyclic.lock().extend(done);
        Ok(())
    }
}

#[cfg(test)]
mod unittests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test::fixture::{StoreFixture, drv};

    #[tokio::test]
    async fn closure_follows_one_level() {
        let fx = StoreFixture::new();
        let bar = drv(fx.path("xyz-bar.drv"), "bar")
            .output("out", fx.path("qux-bar"))
            .output("dev", fx.path("qux-bar-dev"))
            .build();
        let foo = drv(fx.path("abc-foo.drv"), "foo")
            .output("out", fx.path("abc-foo"))
            .input_drv(&bar.path, &["out"])
            .input_file(fx.path("def-baz"))
            .build();
        fx.add_drv(&bar);
        fx.add_drv(&foo);

        let store = DerivationStore::new(fx.store_dir().clone());
        let resolver = Resolver::new(&store);
        let closure = resolver.closure(&foo).await.unwrap();
        assert_eq!(
            closure,
            StorePathSet::from([fx.path("def-baz"), fx.path("qux-bar")])
        );
    }

    #[tokio::test]
    async fn closure_of_leaf_is_input_files() {
        let fx = StoreFixture::new();
        let leaf = drv(fx.path("abc-leaf.drv"), "leaf")
            .output("out", fx.path("abc-leaf"))
            .input_file(fx.path("def-src"))
            .input_file(fx.path("ghi-patch"))
            .build();
        let store = DerivationStore::new(fx.store_dir().clone());
        let resolver = Resolver::new(&store);
        assert_eq!(resolver.closure(&leaf).await.unwrap(), leaf.input_files);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn closure_uses_fixed_output_path() {
        let fx = StoreFixture::new();
        let src = drv(fx.path("src-tarball.drv"), "tarball")
            .fixed_output("out", fx.path("src-tarball"), "0000")
            .build();
        let foo = drv(fx.path("abc-foo.drv"), "foo")
            .output("out", fx.path("abc-foo"))
            .input_drv(&src.path, &["out"])
            .build();
        fx.add_drv(&src);
        let store = DerivationStore::new(fx.store_dir().clone());
        let resolver = Resolver::new(&store);
        assert_eq!(
            resolver.closure(&foo).await.unwrap(),
            StorePathSet::from([fx.path("src-tarball")])
        );
    }

    #[tokio::test]
    async fn two_derivation_cycle() {
        let fx = StoreFixture::new();
        let a_path = fx.path("aaa-a.drv");
        let b_path = fx.path("bbb-b.drv");
        let a = drv(a_path.clone(), "a")
            .output("out", fx.path("aaa-a"))
            .input_drv(&b_path, &["out"])
            .build();
        let b = drv(b_path.clone(), "b")
            .output("out", fx.path("bbb-b"))
            .input_drv(&a_path, &["out"])
            .build();
        fx.add_drv(&a);
        fx.add_drv(&b);

        let store = DerivationStore::new(fx.store_dir().clone());
        let resolver = Resolver::new(&store);
        let err = resolver.closure(&a).await.unwrap_err();
        assert!(matches!(err, Error::Cycle { ref path } if *path == a_path), "{err:?}");
        let err = resolver.requisites(&b).await.unwrap_err();
        assert!(matches!(err, Error::Cycle { ref path } if *path == b_path), "{err:?}");
    }

    #[tokio::test]
    async fn self_cycle() {
        let fx = StoreFixture::new();
        let path = fx.path("aaa-a.drv");
        let a = drv(path.clone(), "a")
            .output("out", fx.path("aaa-a"))
            .input_drv(&path, &["out"])
            .build();
        fx.add_drv(&a);
        let store = DerivationStore::new(fx.store_dir().clone());
        let resolver = Resolver::new(&store);
        let err = resolver.closure(&a).await.unwrap_err();
        assert!(matches!(err, Error::Cycle { path: ref p } if *p == path));
    }

    #[tokio::test]
    async fn diamond_is_not_a_cycle() {
        let fx = StoreFixture::new();
        let base = drv(fx.path("base-base.drv"), "base")
            .output("out", fx.path("base-base"))
            .build();
        let left = drv(fx.path("left-left.drv"), "left")
            .output("out", fx.path("left-left"))
            .input_drv(&base.path, &["out"])
            .build();
        let right = drv(fx.path("right-right.drv"), "right")
            .output("out", fx.path("right-right"))
            .input_drv(&base.path, &["out"])
            .build();
        let top = drv(fx.path("top-top.drv"), "top")
            .output("out", fx.path("top-top"))
            .input_drv(&left.path, &["out"])
            .input_drv(&right.path, &["out"])
            .build();
        for d in [&base, &left, &right] {
            fx.add_drv(d);
        }
        let store = DerivationStore::new(fx.store_dir().clone());
        let resolver = Resolver::new(&store);
        assert_eq!(
            resolver.closure(&top).await.unwrap(),
            StorePathSet::from([fx.path("left-left"), fx.path("right-right")])
        );
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn missing_output() {
        let fx = StoreFixture::new();
        let bar = drv(fx.path("xyz-bar.drv"), "bar")
            .output("out", fx.path("qux-bar"))
            .build();
        let foo = drv(fx.path("abc-foo.drv"), "foo")
            .output("out", fx.path("abc-foo"))
            .input_drv(&bar.path, &["out", "dev"])
            .build();
        fx.add_drv(&bar);
        let store = DerivationStore::new(fx.store_dir().clone());
        let resolver = Resolver::new(&store);
        let err = resolver.closure(&foo).await.unwrap_err();
        match err {
            Error::MissingOutput { drv_path, output } => {
                assert_eq!(drv_path, bar.path);
                assert_eq!(output.as_str(), "dev");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn requisites_walk_whole_graph() {
        let fx = StoreFixture::new();
        let base = drv(fx.path("base-base.drv"), "base")
            .output("out", fx.path("base-base"))
            .input_file(fx.path("src-base"))
            .build();
        let lib = drv(fx.path("lib-lib.drv"), "lib")
            .output("out", fx.path("lib-lib"))
            .output("dev", fx.path("lib-lib-dev"))
            .input_drv(&base.path, &["out"])
            .input_file(fx.path("src-lib"))
            .build();
        let app = drv(fx.path("app-app.drv"), "app")
            .output("out", fx.path("app-app"))
            .input_drv(&lib.path, &["dev"])
            .input_drv(&base.path, &["out"])
            .input_file(fx.path("src-app"))
            .build();
        fx.add_drv(&base);
        fx.add_drv(&lib);

        let store = DerivationStore::new(fx.store_dir().clone());
        let resolver = Resolver::new(&store);
        assert_eq!(
            resolver.requisites(&app).await.unwrap(),
            StorePathSet::from([
                fx.path("src-app"),
                fx.path("lib-lib-dev"),
                fx.path("base-base"),
                fx.path("src-lib"),
                fx.path("src-base"),
            ])
        );
        assert_eq!(
            resolver.closure(&app).await.unwrap(),
            StorePathSet::from([
                fx.path("src-app"),
                fx.path("lib-lib-dev"),
                fx.path("base-base"),
            ])
        );
    }
}
