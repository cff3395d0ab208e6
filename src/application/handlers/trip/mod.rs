//! Trip command and query handlers.
//!
//! Every write goes through [`TripMutator`], which owns the
//! read-compute-swap-retry loop. Handlers only decide what the next value
//! of the trip is and who may produce it.

mod add_activity;
mod add_day;
mod add_participant;
mod create_trip;
mod delete_trip;
mod export_snapshot;
mod get_trip;
mod mutation;
mod remove_activity;
mod remove_day;
mod remove_participant;
mod set_participant_role;
mod subscribe_trip;
mod suggest_activities;
mod update_activity;
mod update_trip_details;

pub use add_activity::{AddActivityCommand, AddActivityHandler, AddActivityResult};
pub use add_day::{AddDayCommand, AddDayHandler, AddDayResult};
pub use add_participant::{AddParticipantCommand, AddParticipantHandler, AddParticipantResult};
pub use create_trip::{CreateTripCommand, CreateTripHandler, CreateTripResult};
pub use delete_trip::{DeleteTripCommand, DeleteTripHandler, DeleteTripResult};
pub use export_snapshot::{ExportTripSnapshotHandler, ExportTripSnapshotQuery};
pub use get_trip::{GetTripHandler, GetTripQuery};
pub use mutation::{MutationOutcome, RetryPolicy, TripMutator};
pub use remove_activity::{RemoveActivityCommand, RemoveActivityHandler};
pub use remove_day::{RemoveDayCommand, RemoveDayHandler};
pub use remove_participant::{
    RemoveParticipantCommand, RemoveParticipantHandler, RemoveParticipantResult,
};
pub use set_participant_role::{SetParticipantRoleCommand, SetParticipantRoleHandler};
pub use subscribe_trip::{SubscribeTripHandler, SubscribeTripQuery, SubscribeTripResult};
pub use suggest_activities::{
    SuggestActivitiesCommand, SuggestActivitiesHandler, SuggestActivitiesResult,
};
pub use update_activity::{UpdateActivityCommand, UpdateActivityHandler};
pub use update_trip_details::{UpdateTripDetailsCommand, UpdateTripDetailsHandler};
