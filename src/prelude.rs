pub use crate::assignment::{Assignment, Assignments};
pub use crate::error::{DataError, Error, Result};
pub use crate::inference::{Engine, Marginals, Posterior, Posteriors};
pub use crate::observable::{Csv, CsvBuilder};
pub use crate::probabilities::Probabilities;
pub use crate::{Evidence, Family, GeneCount, Individual, Record};
