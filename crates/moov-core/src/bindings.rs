//! Wiring the engine into a host

use std::sync::Arc;

use moov_fs::FileSystem;

use crate::actions::ManualActions;
use crate::intercept::{HostServices, Interceptors};
use crate::observer::AutoMoveObserver;
use crate::prefs::Preferences;
use crate::store::{
    DeletedItemsSource, FulltextIndexer, ItemEraser, LinkedFileConverter, MemoryStore, Notifier,
    NotifyType, ObserverId, RecordStore,
};
use crate::suppress::NotifySuppressor;
use crate::transfer::TransferEngine;

/// Name the observer registers under.
pub const OBSERVER_NAME: &str = "moov";
/// Runs after the host's own observers.
pub const OBSERVER_PRIORITY: i32 = 100;

/// Everything the engine needs from its host.
#[derive(Clone)]
pub struct HostContext {
    pub store: Arc<dyn RecordStore>,
    pub notifier: Arc<dyn Notifier>,
    pub indexer: Arc<dyn FulltextIndexer>,
    pub services: HostServices,
    pub fs: Arc<dyn FileSystem>,
    pub prefs: Arc<dyn Preferences>,
}

impl HostContext {
    /// A host backed entirely by a [`MemoryStore`].
    pub fn memory(
        store: Arc<MemoryStore>,
        fs: Arc<dyn FileSystem>,
        prefs: Arc<dyn Preferences>,
    ) -> Self {
        Self {
            store: store.clone(),
            notifier: store.clone(),
            indexer: store.clone(),
            services: HostServices {
                eraser: store.clone(),
                converter: store.clone(),
                deleted_items: store,
            },
            fs,
            prefs,
        }
    }
}

/// The engine while installed in a host.
pub struct Bindings {
    notifier: Arc<dyn Notifier>,
    observer_id: ObserverId,
    observer: AutoMoveObserver,
    interceptors: Interceptors,
    actions: ManualActions,
}

impl Bindings {
    /// Install the interceptors and register the auto-transfer observer.
    pub fn init(host: HostContext) -> Self {
        let suppressor = NotifySuppressor::new();
        let interceptors = Interceptors::install(
            host.services,
            Arc::clone(&host.store),
            Arc::clone(&host.fs),
            Arc::clone(&host.prefs),
            suppressor.clone(),
        );
        let engine = TransferEngine::new(host.store, host.fs, host.indexer, interceptors.eraser());
        let observer = AutoMoveObserver::new(engine.clone(), Arc::clone(&host.prefs), suppressor);
        let observer_id = host.notifier.register_observer(
            Arc::new(observer.clone()),
            &[NotifyType::Item],
            OBSERVER_NAME,
            OBSERVER_PRIORITY,
        );
        tracing::debug!(observer = observer_id.0, "Bindings installed");

        Self {
            notifier: host.notifier,
            observer_id,
            observer,
            interceptors,
            actions: ManualActions::new(engine, host.prefs),
        }
    }

    pub fn observer(&self) -> &AutoMoveObserver {
        &self.observer
    }

    pub fn actions(&self) -> &ManualActions {
        &self.actions
    }

    /// Eraser to use in place of the host's while installed.
    pub fn eraser(&self) -> Arc<dyn ItemEraser> {
        self.interceptors.eraser()
    }

    pub fn converter(&self) -> Arc<dyn LinkedFileConverter> {
        self.interceptors.converter()
    }

    pub fn deleted_items(&self) -> Arc<dyn DeletedItemsSource> {
        self.interceptors.deleted_items()
    }

    /// Unregister, cancel any pending batch and hand back the original
    /// host services.
    pub fn destroy(self) -> HostServices {
        self.notifier.unregister_observer(self.observer_id);
        self.observer.shutdown();
        tracing::debug!("Bindings removed");
        self.interceptors.restore()
    }
}
