pub mod vitals; // Rule table: report text -> vital map
pub mod features; // Vital map -> ordered feature vector
pub mod classifier; // Pre-trained decision forest + ARFF schema
