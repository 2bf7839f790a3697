pub mod config;
pub mod feed;
pub mod identity;
pub mod metadata;
pub mod metrics;
pub mod monitor;
pub mod orchestrator;
pub mod payload;
pub mod placer;
pub mod planner;
pub mod store;
pub mod testing;
pub mod torrent_client;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, InvalidShow,
    SanitizedConfig, ShowConfig, ShowRegistry,
};
pub use feed::{FeedEntry, FeedError, FeedSource, RssFeedSource};
pub use identity::{parse_summary, EpisodeInfo, EpisodeOrdinal, FeedOrder, IdentityError};
pub use metadata::{LookupError, MetadataLookup, ShowHandle, TmdbLookup};
pub use monitor::{run_monitor_pass, MonitorError, MonitorReport, RecordFailure};
pub use orchestrator::{
    AcquisitionContext, AcquisitionOrchestrator, EpisodeCounts, OrchestratorConfig,
    OrchestratorStatus, PassSummary, RetryPolicy,
};
pub use payload::{decode_torrent, HttpPayloadFetcher, PayloadError, PayloadFetcher, TorrentPayload};
pub use placer::{DestinationTemplate, FsPlacer, PlacementMode, PlacerError};
pub use planner::{
    run_discovery_pass, DiscoveryReport, PlannerError, ShowDiscovery, SkipCounts, SkipReason,
    SubmittedEpisode,
};
pub use store::{
    EpisodeFilter, EpisodeRecord, EpisodeStatus, EpisodeStore, NewEpisode, SqliteEpisodeStore,
    StoreError,
};
pub use torrent_client::{
    AddTorrentRequest, AddTorrentResult, QBittorrentClient, TorrentClient, TorrentClientError,
    TorrentInfo, TorrentState, TransmissionClient,
};
