pub(crate) mod counts;
pub(crate) mod run;
