use futures::future::join_all;
use tokio::task::JoinError;
use tracing::{error, info};

use crate::{
    core::context::{GuideResult, TripContext},
    services::resolver::QueryResolver,
    types::{
        intent::TripIntent,
        resolution::{QuerySubject, ResolutionResult},
    },
};

/// Resolve every outbound leg, the return leg, every hotel city and the
/// guide concurrently, then assemble the context once all of them finished.
///
/// Each slot runs in its own task; a task that panics yields an
/// error-bearing result for that slot and leaves its siblings untouched.
pub async fn resolve_all(resolver: &QueryResolver, intent: &TripIntent, raw_text: &str) -> TripContext {
    info!(
        target: "tripwise::batch",
        source = %intent.source_city,
        destinations = intent.destination_cities.len(),
        "starting batch resolution"
    );

    let outbound_subjects: Vec<QuerySubject> = intent
        .outbound_legs()
        .map(|(from, to)| QuerySubject::flights(from, to))
        .collect();
    let return_subjects: Vec<QuerySubject> = intent
        .return_leg()
        .map(|(from, to)| QuerySubject::flights(from, to))
        .into_iter()
        .collect();
    let hotel_subjects: Vec<QuerySubject> = intent
        .destination_cities
        .iter()
        .map(QuerySubject::hotels)
        .collect();

    let outbound = join_all(
        outbound_subjects
            .iter()
            .map(|subject| spawn_resolution(resolver, subject.clone())),
    );
    let returns = join_all(
        return_subjects
            .iter()
            .map(|subject| spawn_resolution(resolver, subject.clone())),
    );
    let hotels = join_all(
        hotel_subjects
            .iter()
            .map(|subject| spawn_resolution(resolver, subject.clone())),
    );
    let guide = {
        let resolver = resolver.clone();
        let intent = intent.clone();
        let raw_text = raw_text.to_string();
        tokio::spawn(async move { resolver.search_guide(&intent, &raw_text).await })
    };

    let (outbound, returns, hotels, guide) = tokio::join!(outbound, returns, hotels, guide);

    let mut context = TripContext::new(intent.clone());
    context.flights_outbound = collect_slots(outbound_subjects, outbound);
    context.flights_return = collect_slots(return_subjects, returns);
    context.hotels = collect_slots(hotel_subjects, hotels);
    context.guide = guide.unwrap_or_else(|err| {
        error!(target: "tripwise::batch", error = %err, "guide task failed");
        GuideResult {
            error: Some(format!("guide task failed: {}", err)),
            ..GuideResult::default()
        }
    });

    info!(
        target: "tripwise::batch",
        have_flights = context.have_flights(),
        have_hotels = context.have_hotels(),
        have_guide = context.have_guide(),
        "batch resolution finished"
    );
    context
}

fn spawn_resolution(
    resolver: &QueryResolver,
    subject: QuerySubject,
) -> tokio::task::JoinHandle<ResolutionResult> {
    let resolver = resolver.clone();
    tokio::spawn(async move {
        match subject {
            QuerySubject::Flights { from, to } => resolver.resolve_flights(&from, &to).await,
            QuerySubject::Hotels { city } => resolver.resolve_hotels(&city).await,
            QuerySubject::Guide { .. } => {
                ResolutionResult::failed(subject, "guide subjects are searched, not resolved")
            }
        }
    })
}

/// Pair every joined task with its subject, keeping slot order.
fn collect_slots(
    subjects: Vec<QuerySubject>,
    joined: Vec<Result<ResolutionResult, JoinError>>,
) -> Vec<ResolutionResult> {
    subjects
        .into_iter()
        .zip(joined)
        .map(|(subject, outcome)| {
            outcome.unwrap_or_else(|err| {
                error!(target: "tripwise::batch", subject = %subject, error = %err, "resolution task failed");
                ResolutionResult::failed(subject, format!("resolution task failed: {}", err))
            })
        })
        .collect()
}
