pub(crate) mod chunking;
pub(crate) mod content_origin;
pub(crate) mod extraction;
pub(crate) mod grading;
pub(crate) mod llm;
pub(crate) mod report_parser;
pub(crate) mod rubric;
pub(crate) mod vector_index;
