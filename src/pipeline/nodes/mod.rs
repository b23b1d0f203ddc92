mod feedback;
mod generate;
mod grade;
mod regenerate;
mod retrieve;
mod transform_query;
mod web_search;

pub use feedback::FeedbackNode;
pub use generate::GenerateNode;
pub use grade::GradeDocumentsNode;
pub use regenerate::RegenerateNode;
pub use retrieve::RetrieveNode;
pub use transform_query::TransformQueryNode;
pub use web_search::WebSearchNode;
