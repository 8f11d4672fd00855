use bevy::prelude::*;

use crate::config::tuning::Tuning;
use crate::game::catalog::Catalog;
use crate::game::notify::Toast;
use crate::game::session::Commit;
use crate::storage::local_state::{LocalStateFile, RememberedLoginFile};
use crate::storage::reconcile::{PersistQueue, PersistReports, spawn_persist_worker};
use crate::storage::repo::StoreError;
use crate::storage::sqlite_repo::SqliteProfileStore;

/// Persisted tokio runtime for sync DB calls outside startup.
#[derive(Resource)]
pub struct TokioRuntime(pub tokio::runtime::Runtime);

pub struct StoragePlugin;

impl Plugin for StoragePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, init_storage);
        app.add_systems(
            Update,
            drain_persist_reports.run_if(resource_exists::<PersistReports>),
        );
    }
}

pub fn init_storage(world: &mut World) {
    let data_dir = Tuning::data_dir();
    world.insert_resource(LocalStateFile::in_dir(&data_dir));
    world.insert_resource(RememberedLoginFile::in_dir(&data_dir));

    let db_path = data_dir.join("taverna_gacha.db");
    info!("Initializing SQLite at {:?}", db_path);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}, running offline only");
            return;
        }
    };

    let tuning = world.get_resource::<Tuning>().cloned().unwrap_or_default();
    let catalog = world
        .get_resource::<Catalog>()
        .cloned()
        .unwrap_or_else(Catalog::with_defaults);

    let opened = rt.block_on(async {
        let store = SqliteProfileStore::new(&db_path).await?;
        store.seed_profiles(&tuning.seed_profiles).await?;
        store.migrate_item_ids(&catalog).await?;
        Ok::<_, StoreError>(store)
    });

    match opened {
        Ok(store) => {
            info!("SQLite initialized successfully");
            let (queue, reports) =
                spawn_persist_worker(rt.handle(), store.clone(), tuning.retry_policy());
            world.insert_resource(store);
            world.insert_resource(queue);
            world.insert_resource(reports);
        }
        Err(e) => {
            error!("Failed to initialize SQLite: {e}");
        }
    }
    // Keep runtime alive for login lookups and the persist worker
    world.insert_resource(TokioRuntime(rt));
}

/// Hand a session mutation to whichever backend owns it.
pub fn apply_commit(
    commit: Commit,
    local: Option<&LocalStateFile>,
    queue: Option<&PersistQueue>,
    toasts: &mut MessageWriter<Toast>,
) {
    match commit {
        Commit::Nothing => {}
        Commit::SaveLocal(blob) => {
            let Some(local) = local else {
                warn!("No local save file configured, progress not saved");
                return;
            };
            if let Err(e) = local.save(&blob) {
                error!("Failed to save local state: {e}");
                toasts.write(Toast::store_failure("progress", &e.to_string()));
            }
        }
        Commit::Remote(jobs) => {
            let Some(queue) = queue else {
                error!("Profile store is not available, dropping {} writes", jobs.len());
                toasts.write(Toast::store_failure("progress", "profile store unavailable"));
                return;
            };
            for job in jobs {
                queue.submit(job);
            }
        }
    }
}

fn drain_persist_reports(reports: Res<PersistReports>, mut toasts: MessageWriter<Toast>) {
    for report in reports.drain() {
        match report.outcome {
            Ok(()) => debug!("Persisted {}", report.job.describe()),
            Err(e) => {
                toasts.write(Toast::store_failure(&report.job.describe(), &e));
            }
        }
    }
}
