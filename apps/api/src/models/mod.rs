pub mod contact;
pub mod draft;
pub mod evidence;
pub mod job;
pub mod scoring_run;
pub mod target;
