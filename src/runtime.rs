//! Composition root.
//!
//! `TripSyncRuntime` owns the shared ports and the background tasks (the
//! fan-out worker and the subscriber reaper) and builds handlers on demand
//! from that shared state.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::adapters::{
    spawn_reaper, InMemoryEventBus, InMemoryProfileDirectory, InMemoryTripStore,
    MockSuggestionProvider, PostgresProfileDirectory, PostgresTripStore, TripRooms,
    TripRoomsConfig,
};
use crate::application::fanout::{
    FanoutEngine, FanoutQueue, FanoutReport, FanoutTrigger, FanoutWorker,
};
use crate::application::handlers::profile::{RegisterProfileHandler, UpdateDisplayFieldsHandler};
use crate::application::handlers::trip::{
    AddActivityHandler, AddDayHandler, AddParticipantHandler, CreateTripHandler,
    DeleteTripHandler, ExportTripSnapshotHandler, GetTripHandler, RemoveActivityHandler,
    RemoveDayHandler, RemoveParticipantHandler, RetryPolicy, SetParticipantRoleHandler,
    SubscribeTripHandler, SuggestActivitiesHandler, TripMutator, UpdateActivityHandler,
    UpdateTripDetailsHandler,
};
use crate::config::{AppConfig, ValidationError};
use crate::domain::profile::PROFILE_DISPLAY_FIELDS_UPDATED;
use crate::ports::{
    ChangeNotifier, EventPublisher, EventSubscriber, ProfileDirectory, SuggestionProvider,
    TripStore,
};

/// Finished fan-out reports kept for a caller that has not taken them yet.
/// Later reports are dropped until the buffer is drained.
pub const FANOUT_REPORT_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("database url is not configured")]
    DatabaseNotConfigured,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage and collaborators the runtime is assembled from.
pub struct RuntimeParts {
    pub store: Arc<dyn TripStore>,
    pub directory: Arc<dyn ProfileDirectory>,
    pub rooms: TripRooms,
    pub suggestions: Arc<dyn SuggestionProvider>,
}

pub struct TripSyncRuntime {
    store: Arc<dyn TripStore>,
    directory: Arc<dyn ProfileDirectory>,
    rooms: TripRooms,
    events: Arc<InMemoryEventBus>,
    suggestions: Arc<dyn SuggestionProvider>,
    mutator: TripMutator,
    fanout_queue: FanoutQueue,
    fanout_reports: Mutex<Option<mpsc::Receiver<FanoutReport>>>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl TripSyncRuntime {
    /// Everything in process. Must be called inside a Tokio runtime.
    pub fn in_memory(config: &AppConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let rooms = TripRooms::new(TripRoomsConfig::from(&config.notifier));
        let notifier: Arc<dyn ChangeNotifier> = Arc::new(rooms.clone());

        Ok(Self::assemble(
            config,
            RuntimeParts {
                store: Arc::new(InMemoryTripStore::new(notifier)),
                directory: Arc::new(InMemoryProfileDirectory::new()),
                rooms,
                suggestions: Arc::new(MockSuggestionProvider::new()),
            },
        ))
    }

    /// PostgreSQL storage with in-process notification.
    pub async fn postgres(config: &AppConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        if !config.database.is_configured() {
            return Err(RuntimeError::DatabaseNotConfigured);
        }

        let pool = crate::adapters::postgres::connect(&config.database).await?;
        if config.database.run_migrations {
            crate::adapters::postgres::migrate(&pool).await?;
        }

        let rooms = TripRooms::new(TripRoomsConfig::from(&config.notifier));
        let notifier: Arc<dyn ChangeNotifier> = Arc::new(rooms.clone());

        Ok(Self::assemble(
            config,
            RuntimeParts {
                store: Arc::new(PostgresTripStore::new(pool.clone(), notifier)),
                directory: Arc::new(PostgresProfileDirectory::new(pool)),
                rooms,
                suggestions: Arc::new(MockSuggestionProvider::new()),
            },
        ))
    }

    /// Wires handlers and starts background tasks around `parts`.
    pub fn assemble(config: &AppConfig, parts: RuntimeParts) -> Self {
        let RuntimeParts {
            store,
            directory,
            rooms,
            suggestions,
        } = parts;

        let events = Arc::new(InMemoryEventBus::new());
        let mutator = TripMutator::new(
            store.clone(),
            events.clone(),
            RetryPolicy::from(&config.mutation),
        );

        // 1. Fan-out: edits enqueue, the worker drains
        let (fanout_queue, receiver) = FanoutQueue::bounded(config.fanout.queue_capacity);
        events.subscribe(
            PROFILE_DISPLAY_FIELDS_UPDATED,
            Arc::new(FanoutTrigger::new(fanout_queue.clone())),
        );
        let engine = Arc::new(FanoutEngine::new(
            directory.clone(),
            mutator.clone(),
            config.fanout.max_concurrency,
        ));
        let (report_sink, reports) = mpsc::channel(FANOUT_REPORT_BUFFER);
        let worker = FanoutWorker::new(engine, fanout_queue.clone(), receiver, &config.fanout)
            .with_report_sink(report_sink);

        // 2. Background tasks share one shutdown signal
        let (shutdown, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(worker.run(shutdown_rx.clone())),
            spawn_reaper(rooms.clone(), shutdown_rx),
        ];

        tracing::info!(
            max_attempts = config.mutation.max_attempts,
            fanout_concurrency = config.fanout.max_concurrency,
            "tripsync runtime started"
        );

        Self {
            store,
            directory,
            rooms,
            events,
            suggestions,
            mutator,
            fanout_queue,
            fanout_reports: Mutex::new(Some(reports)),
            shutdown,
            tasks,
        }
    }

    pub fn store(&self) -> Arc<dyn TripStore> {
        self.store.clone()
    }

    pub fn directory(&self) -> Arc<dyn ProfileDirectory> {
        self.directory.clone()
    }

    pub fn rooms(&self) -> &TripRooms {
        &self.rooms
    }

    pub fn events(&self) -> Arc<InMemoryEventBus> {
        self.events.clone()
    }

    pub fn fanout_queue(&self) -> &FanoutQueue {
        &self.fanout_queue
    }

    /// Hands out the stream of finished fan-out reports. Only the first
    /// caller gets it; at most [`FANOUT_REPORT_BUFFER`] wait unread.
    pub fn take_fanout_reports(&self) -> Option<mpsc::Receiver<FanoutReport>> {
        self.fanout_reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn publisher(&self) -> Arc<dyn EventPublisher> {
        self.events.clone()
    }

    // Trip handlers

    pub fn create_trip_handler(&self) -> CreateTripHandler {
        CreateTripHandler::new(self.store.clone(), self.directory.clone(), self.publisher())
    }

    pub fn get_trip_handler(&self) -> GetTripHandler {
        GetTripHandler::new(self.store.clone())
    }

    pub fn subscribe_trip_handler(&self) -> SubscribeTripHandler {
        SubscribeTripHandler::new(self.store.clone())
    }

    pub fn delete_trip_handler(&self) -> DeleteTripHandler {
        DeleteTripHandler::new(
            self.store.clone(),
            self.directory.clone(),
            self.publisher(),
            self.mutator.policy().clone(),
        )
    }

    pub fn update_trip_details_handler(&self) -> UpdateTripDetailsHandler {
        UpdateTripDetailsHandler::new(self.mutator.clone())
    }

    pub fn add_day_handler(&self) -> AddDayHandler {
        AddDayHandler::new(self.mutator.clone())
    }

    pub fn remove_day_handler(&self) -> RemoveDayHandler {
        RemoveDayHandler::new(self.mutator.clone())
    }

    pub fn add_activity_handler(&self) -> AddActivityHandler {
        AddActivityHandler::new(self.mutator.clone())
    }

    pub fn update_activity_handler(&self) -> UpdateActivityHandler {
        UpdateActivityHandler::new(self.mutator.clone())
    }

    pub fn remove_activity_handler(&self) -> RemoveActivityHandler {
        RemoveActivityHandler::new(self.mutator.clone())
    }

    pub fn add_participant_handler(&self) -> AddParticipantHandler {
        AddParticipantHandler::new(self.mutator.clone(), self.directory.clone())
    }

    pub fn remove_participant_handler(&self) -> RemoveParticipantHandler {
        RemoveParticipantHandler::new(self.mutator.clone(), self.directory.clone())
    }

    pub fn set_participant_role_handler(&self) -> SetParticipantRoleHandler {
        SetParticipantRoleHandler::new(self.mutator.clone())
    }

    pub fn export_snapshot_handler(&self) -> ExportTripSnapshotHandler {
        ExportTripSnapshotHandler::new(self.store.clone())
    }

    pub fn suggest_activities_handler(&self) -> SuggestActivitiesHandler {
        SuggestActivitiesHandler::new(self.store.clone(), self.suggestions.clone())
    }

    // Profile handlers

    pub fn register_profile_handler(&self) -> RegisterProfileHandler {
        RegisterProfileHandler::new(self.directory.clone())
    }

    pub fn update_display_fields_handler(&self) -> UpdateDisplayFieldsHandler {
        UpdateDisplayFieldsHandler::new(self.directory.clone(), self.publisher())
    }

    /// Signals background tasks and waits for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }
        tracing::info!("tripsync runtime stopped");
    }
}
