//! Audit rubric, weight table and verdict scoring.
//!
//! The rubric is configuration: the built-in default is the ten-point
//! good-lawmaking checklist, and a JSON file with the same shape can replace
//! it. Weights must sum to 100 so the total reads as a score out of 100.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The only values a criterion may score: no, partially, yes.
pub const SCORE_VALUES: [f64; 3] = [0.0, 0.5, 1.0];

const WEIGHT_TOTAL: f64 = 100.0;

#[derive(Debug, Error)]
pub enum RubricError {
    #[error("failed to read rubric file: {0}")]
    Io(#[from] std::io::Error),
    #[error("rubric JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rubric has no criteria")]
    Empty,
    #[error("duplicate criterion id {0}")]
    DuplicateId(u32),
    #[error("criterion weights sum to {0}, expected 100")]
    WeightSum(f64),
}

/// One rubric item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: u32,
    pub title: String,
    /// The question put to the auditor.
    pub question: String,
    pub weight: f64,
}

/// The fixed checklist plus instructions for the auditor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub name: String,
    pub instructions: String,
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    pub fn from_json(json: &str) -> Result<Self, RubricError> {
        let rubric: Rubric = serde_json::from_str(json)?;
        rubric.validate()?;
        Ok(rubric)
    }

    pub fn load(path: &Path) -> Result<Self, RubricError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), RubricError> {
        if self.criteria.is_empty() {
            return Err(RubricError::Empty);
        }
        let mut seen = HashSet::new();
        for c in &self.criteria {
            if !seen.insert(c.id) {
                return Err(RubricError::DuplicateId(c.id));
            }
        }
        let sum: f64 = self.criteria.iter().map(|c| c.weight).sum();
        if (sum - WEIGHT_TOTAL).abs() > 1e-6 {
            return Err(RubricError::WeightSum(sum));
        }
        Ok(())
    }

    pub fn weight(&self, id: u32) -> Option<f64> {
        self.criteria.iter().find(|c| c.id == id).map(|c| c.weight)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.criteria.iter().map(|c| c.id)
    }

    /// Σ score_value × weight[id]. Unknown ids contribute nothing.
    pub fn score(&self, scores: &[CriterionScore]) -> f64 {
        scores
            .iter()
            .map(|s| s.score_value * self.weight(s.id).unwrap_or(0.0))
            .sum()
    }
}

impl Default for Rubric {
    fn default() -> Self {
        let items: [(&str, &str, f64); 10] = [
            (
                "Διαβούλευση",
                "Έγινε προ-κοινοβουλευτική διαβούλευση; Διήρκεσε περισσότερο ή λιγότερο από 14 ημέρες (χρησιμοποίησε τις ημερομηνίες της διαβούλευσης); Παρουσιάστηκαν τα ευρήματα σε ξεχωριστή έκθεση;",
                15.0,
            ),
            (
                "Χρόνος Ακρόασης",
                "Ο μέσος χρόνος που δόθηκε στην ακρόαση φορέων υπερβαίνει τα 5 λεπτά;",
                5.0,
            ),
            (
                "Νομοθετική Διαδικασία",
                "Υπάρχουν διατάξεις που εμφανίστηκαν ως (πολυ-)τροπολογίες ή «λοιπές/επείγουσες διατάξεις» άσχετες με τον τίτλο;",
                10.0,
            ),
            (
                "Gold-plating",
                "Υπάρχει «επιχρύσωση»: προσθήκη εθνικών βαρών πέρα από όσα απαιτεί ο ενσωματούμενος διεθνής ή ενωσιακός κανόνας;",
                10.0,
            ),
            (
                "Νησιωτικότητα",
                "Υπάρχουν ειδικές διατάξεις για τους ορεινούς όγκους και τα νησιά (ρήτρα νησιωτικότητας στην έκθεση συνεπειών);",
                5.0,
            ),
            (
                "Ανάλυση Κόστους",
                "Υπάρχει τεκμηριωμένη ανάλυση κόστους-οφέλους με ποσοτικά στοιχεία για το όφελος;",
                15.0,
            ),
            (
                "Απλούστευση",
                "Υπάρχουν διατάξεις που απλουστεύουν ή καταργούν διοικητικές επιβαρύνσεις;",
                10.0,
            ),
            (
                "Εξουσιοδοτήσεις",
                "Παρέχονται εξουσιοδοτήσεις για υπουργικές αποφάσεις σε θέματα του κυρίως αντικειμένου του νόμου;",
                10.0,
            ),
            (
                "Μηχανισμοί Εφαρμογής",
                "Αναφέρονται ειδικότεροι μηχανισμοί εφαρμογής (χρονοδιαγράμματα, πλατφόρμες);",
                10.0,
            ),
            (
                "Σαφήνεια Γλώσσας",
                "Είναι ο νόμος κατανοητός, χωρίς συντακτικά λάθη, αοριστίες και αλυσίδες παραπομπών;",
                10.0,
            ),
        ];

        let criteria = items
            .iter()
            .enumerate()
            .map(|(i, (title, question, weight))| Criterion {
                id: i as u32 + 1,
                title: title.to_string(),
                question: question.to_string(),
                weight: *weight,
            })
            .collect();

        Self {
            name: "Δεκάλογος καλής νομοθέτησης".to_string(),
            instructions: "\
Ενεργείς ως Ελεγκτής Ποιότητας Νομοθεσίας. Έχεις στη διάθεσή σου τα κείμενα του νόμου, \
τις εκθέσεις που τον συνοδεύουν και στοιχεία της δημόσιας διαβούλευσης.
Βαθμολόγησε κάθε κριτήριο με 1 (ΝΑΙ), 0.5 (ΜΕΡΙΚΩΣ) ή 0 (ΟΧΙ) και τεκμηρίωσε την απάντηση \
με αναφορά στα κείμενα. Μην επινοείς στοιχεία που δεν υπάρχουν στα έγγραφα."
                .to_string(),
            criteria,
        }
    }
}

/// Score for one rubric criterion as returned by the auditor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub id: u32,
    pub title: String,
    pub score_value: f64,
    pub reason: String,
}

impl CriterionScore {
    /// Weighted points this criterion contributes under `rubric`.
    pub fn points(&self, rubric: &Rubric) -> f64 {
        self.score_value * rubric.weight(self.id).unwrap_or(0.0)
    }
}

pub fn is_valid_score(value: f64) -> bool {
    SCORE_VALUES.iter().any(|v| (v - value).abs() < f64::EPSILON)
}

/// Final audit result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub criteria: Vec<CriterionScore>,
    pub summary: String,
    pub total_score: f64,
    /// Model identifier that produced the verdict.
    pub model: String,
}

impl Verdict {
    /// Assemble a verdict, computing `total_score` from the rubric weights.
    pub fn scored(
        criteria: Vec<CriterionScore>,
        summary: String,
        model: impl Into<String>,
        rubric: &Rubric,
    ) -> Self {
        let total_score = rubric.score(&criteria);
        Self {
            criteria,
            summary,
            total_score,
            model: model.into(),
        }
    }
}
