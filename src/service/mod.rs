pub mod aligner;
pub mod bill_recognition;
pub mod guest_extraction;
pub mod pipeline;
pub mod split;

pub use aligner::{parse_alignment, Aligner};
pub use bill_recognition::{parse_order, BillRecognizer};
pub use guest_extraction::{parse_mentions, transcribe_description, MentionExtractor};
pub use pipeline::{Reconciliation, SplitService};
pub use split::{export_split_csv, split_costs};
