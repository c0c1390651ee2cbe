mod ids;
mod row;
mod subject;

pub use ids::{ParseIdError, RowId, SubjectId};

pub use row::{
    empty_rounds, RoundData, RoundField, RowData, RowError, DEFAULT_ROW_NAMES, TOTAL_ROUNDS,
};
pub use subject::{SubjectData, SubjectError, SubjectInfo, SubjectKey, DEFAULT_SUBJECTS};
