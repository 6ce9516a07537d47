use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }
    };
}

catalog_id!(
    /// Catalog identifier of a job.
    JobId
);
catalog_id!(
    /// Catalog identifier of a volume (media record).
    MediaId
);
catalog_id!(PoolId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let id: JobId = " 17 ".parse().unwrap();
        assert_eq!(id, JobId(17));
        assert_eq!(id.to_string(), "17");
        assert_eq!(format!("{id:?}"), "JobId(17)");
        assert!("x".parse::<MediaId>().is_err());
    }
}
