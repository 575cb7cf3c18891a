pub mod cleanup;
pub mod compute;
pub mod domain;
pub mod drive;
pub mod field;
pub mod runner;
pub mod scripts;
pub mod table;
