use std::fmt;

#[derive(Debug)]
pub enum Error {
    // Configuration errors
    StationTooLong {
        station: String,
        max_train_length: usize,
        global_max: usize,
    },
    DuplicateStation(String),
    UnknownStation(String),
    ArrangementOutOfRange {
        station: String,
        arrangement: String,
    },
    TripNotConnected {
        origin: String,
        destination: String,
    },
    InvalidInstance(String),

    // Structural errors
    InsideConnectionBetweenStations {
        origin: usize,
        destination: usize,
    },
    EmptyHyperedge,
    ManyToManyHyperedge {
        origins: usize,
        destinations: usize,
    },

    // Model errors
    UnserviceableTrip {
        origin: String,
        destination: String,
    },

    Solver(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StationTooLong {
                station,
                max_train_length,
                global_max,
            } => write!(
                f,
                "station '{}' supports trains of length {}, which exceeds the global maximum train length {}",
                station, max_train_length, global_max
            ),
            Error::DuplicateStation(name) => {
                write!(f, "got two train stations with the same name '{}'", name)
            }
            Error::UnknownStation(name) => write!(f, "can't find station with name '{}'", name),
            Error::ArrangementOutOfRange {
                station,
                arrangement,
            } => write!(
                f,
                "arrangement {} of station '{}' is outside the arrangement space",
                arrangement, station
            ),
            Error::TripNotConnected {
                origin,
                destination,
            } => write!(
                f,
                "the timetable trip from '{}' to '{}' can't be serviced, no suitable connection runs between them",
                origin, destination
            ),
            Error::InvalidInstance(msg) => write!(f, "invalid instance: {}", msg),
            Error::InsideConnectionBetweenStations {
                origin,
                destination,
            } => write!(
                f,
                "the connection between stations {} and {} can't be a connection inside a train station",
                origin, destination
            ),
            Error::EmptyHyperedge => write!(f, "a hyperedge needs at least one connection"),
            Error::ManyToManyHyperedge {
                origins,
                destinations,
            } => write!(
                f,
                "hyperedges can not map from multiple stations to multiple stations ({} origins, {} destinations)",
                origins, destinations
            ),
            Error::UnserviceableTrip {
                origin,
                destination,
            } => write!(
                f,
                "no admissible hyperedge services the timetable trip from '{}' to '{}'",
                origin, destination
            ),
            Error::Solver(msg) => write!(f, "solver failed: {}", msg),
            Error::Io(e) => write!(f, "i/o error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
