// Library root: the aggregation and ranking core behind the club record views.
//
// Raw `players` / `matches` documents are loaded once per view into a
// `LeagueSnapshot`; every derived table below is computed synchronously from
// that frozen snapshot.

pub mod config;
pub mod history;
pub mod model;
pub mod partners;
pub mod positions;
pub mod ranking;
pub mod records;
pub mod snapshot;
pub mod store;
pub mod tables;
