//! Two-player bimatrix games and Nash equilibria by support enumeration.
//!
//! For every pair of equal-size supports, each player's mixed strategy is
//! solved so that the opponent is indifferent across the opponent's support.
//! A candidate pair is kept when both strategies respect their supports and
//! each is a best response to the other.

use std::fmt;

use nalgebra::{DMatrix, DVector};

use super::error::QuantError;

/// Probabilities at or below this are treated as zero.
const SUPPORT_TOLERANCE: f64 = 1e-12;
/// Slack allowed in the best-response comparison.
const BEST_RESPONSE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    row_payoffs: DMatrix<f64>,
    col_payoffs: DMatrix<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Equilibrium {
    pub row_strategy: Vec<f64>,
    pub col_strategy: Vec<f64>,
}

impl Equilibrium {
    pub fn is_pure(&self) -> bool {
        let pure = |s: &[f64]| s.iter().filter(|p| **p > SUPPORT_TOLERANCE).count() == 1;
        pure(&self.row_strategy) && pure(&self.col_strategy)
    }
}

fn fmt_strategy(f: &mut fmt::Formatter<'_>, strategy: &[f64]) -> fmt::Result {
    write!(f, "(")?;
    for (i, p) in strategy.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{p:.4}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Equilibrium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row ")?;
        fmt_strategy(f, &self.row_strategy)?;
        write!(f, ", column ")?;
        fmt_strategy(f, &self.col_strategy)
    }
}

/// Which equilibria a caller keeps from the enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    /// Only the last one enumerated, as the coursework script printed.
    Last,
}

impl std::str::FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Selection::All),
            "last" => Ok(Selection::Last),
            other => Err(format!("unknown selection '{other}' (expected all or last)")),
        }
    }
}

impl Selection {
    pub fn apply(self, mut equilibria: Vec<Equilibrium>) -> Vec<Equilibrium> {
        match self {
            Selection::All => equilibria,
            Selection::Last => equilibria.pop().into_iter().collect(),
        }
    }
}

impl Game {
    /// `row_payoffs[i][j]` and `col_payoffs[i][j]` are the payoffs when row
    /// plays `i` and column plays `j`.
    pub fn new(row_payoffs: DMatrix<f64>, col_payoffs: DMatrix<f64>) -> Result<Self, QuantError> {
        if row_payoffs.is_empty() {
            return Err(QuantError::insufficient("row player strategies", 0, 1));
        }
        if row_payoffs.nrows() != col_payoffs.nrows() {
            return Err(QuantError::mismatch(
                "column payoff rows",
                row_payoffs.nrows(),
                col_payoffs.nrows(),
            ));
        }
        if row_payoffs.ncols() != col_payoffs.ncols() {
            return Err(QuantError::mismatch(
                "column payoff columns",
                row_payoffs.ncols(),
                col_payoffs.ncols(),
            ));
        }
        if row_payoffs.iter().chain(col_payoffs.iter()).any(|v| !v.is_finite()) {
            return Err(QuantError::Solver {
                reason: "payoffs must be finite".into(),
            });
        }
        Ok(Self {
            row_payoffs,
            col_payoffs,
        })
    }

    pub fn from_rows(row_payoffs: &[Vec<f64>], col_payoffs: &[Vec<f64>]) -> Result<Self, QuantError> {
        Self::new(matrix_from_rows(row_payoffs)?, matrix_from_rows(col_payoffs)?)
    }

    pub fn row_payoffs(&self) -> &DMatrix<f64> {
        &self.row_payoffs
    }

    pub fn col_payoffs(&self) -> &DMatrix<f64> {
        &self.col_payoffs
    }

    pub fn shape(&self) -> (usize, usize) {
        self.row_payoffs.shape()
    }

    /// True iff the column payoffs are the exact negation of the row payoffs.
    pub fn is_zero_sum(&self) -> bool {
        self.row_payoffs
            .iter()
            .zip(self.col_payoffs.iter())
            .all(|(a, b)| *b == -*a)
    }

    /// Expected payoffs `(row, column)` under a strategy profile.
    pub fn expected_payoffs(&self, eq: &Equilibrium) -> (f64, f64) {
        let x = DVector::from_column_slice(&eq.row_strategy);
        let y = DVector::from_column_slice(&eq.col_strategy);
        (
            x.dot(&(&self.row_payoffs * &y)),
            x.dot(&(&self.col_payoffs * &y)),
        )
    }

    /// Neither player gains by deviating to any pure strategy.
    pub fn is_nash(&self, eq: &Equilibrium) -> bool {
        let (m, n) = self.shape();
        if eq.row_strategy.len() != m || eq.col_strategy.len() != n {
            return false;
        }
        let x = DVector::from_column_slice(&eq.row_strategy);
        let y = DVector::from_column_slice(&eq.col_strategy);

        let row_deviation = &self.row_payoffs * &y;
        let col_deviation = self.col_payoffs.transpose() * &x;
        let (row_value, col_value) = (x.dot(&row_deviation), y.dot(&col_deviation));

        let best_row = row_deviation.max();
        let best_col = col_deviation.max();
        best_row <= row_value + BEST_RESPONSE_TOLERANCE * (1.0 + best_row.abs())
            && best_col <= col_value + BEST_RESPONSE_TOLERANCE * (1.0 + best_col.abs())
    }

    /// Every equilibrium found, in enumeration order.
    pub fn support_enumeration(&self) -> Vec<Equilibrium> {
        let (m, n) = self.shape();
        let col_transposed = self.col_payoffs.transpose();
        let mut found = Vec::new();

        for size in 1..=m.min(n) {
            for row_support in combinations(m, size) {
                for col_support in combinations(n, size) {
                    // Row mixes to make column indifferent, and vice versa.
                    let Some(x) = solve_indifference(&col_transposed, &col_support, &row_support)
                    else {
                        continue;
                    };
                    let Some(y) = solve_indifference(&self.row_payoffs, &row_support, &col_support)
                    else {
                        continue;
                    };
                    if !obeys_support(&x, &row_support) || !obeys_support(&y, &col_support) {
                        continue;
                    }

                    let eq = Equilibrium {
                        row_strategy: x.iter().map(|p| p.max(0.0)).collect(),
                        col_strategy: y.iter().map(|p| p.max(0.0)).collect(),
                    };
                    if self.is_nash(&eq) {
                        tracing::debug!(?row_support, ?col_support, "equilibrium found");
                        found.push(eq);
                    }
                }
            }
        }

        if found.len() % 2 == 0 {
            tracing::warn!(
                count = found.len(),
                "even number of equilibria found; the game is degenerate and enumeration may be incomplete"
            );
        }
        found
    }
}

/// All `k`-element subsets of `0..n` in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        let Some(i) = (0..k).rev().find(|&i| idx[i] != i + n - k) else {
            return out;
        };
        idx[i] += 1;
        for j in i + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}

/// Strategy over the columns of `payoffs` that makes the player choosing
/// among `rows` indifferent, with zero weight outside `columns`.
fn solve_indifference(
    payoffs: &DMatrix<f64>,
    rows: &[usize],
    columns: &[usize],
) -> Option<DVector<f64>> {
    let n = payoffs.ncols();
    let mut system = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);
    let mut eq = 0;

    for pair in rows.windows(2) {
        for c in 0..n {
            system[(eq, c)] = payoffs[(pair[1], c)] - payoffs[(pair[0], c)];
        }
        eq += 1;
    }
    for c in (0..n).filter(|c| !columns.contains(c)) {
        system[(eq, c)] = 1.0;
        eq += 1;
    }
    for c in 0..n {
        system[(eq, c)] = 1.0;
    }
    rhs[eq] = 1.0;
    eq += 1;

    if eq != n {
        return None;
    }
    let solution = system.lu().solve(&rhs)?;
    solution
        .iter()
        .all(|p| p.is_finite() && *p >= -SUPPORT_TOLERANCE)
        .then_some(solution)
}

fn obeys_support(strategy: &DVector<f64>, support: &[usize]) -> bool {
    strategy.iter().enumerate().all(|(i, &p)| {
        if support.contains(&i) {
            p > SUPPORT_TOLERANCE
        } else {
            p <= SUPPORT_TOLERANCE
        }
    })
}

fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, QuantError> {
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
        return Err(QuantError::mismatch("payoff row length", ncols, bad.len()));
    }
    Ok(DMatrix::from_fn(rows.len(), ncols, |r, c| rows[r][c]))
}

/// Parse `"25,9;33,10"` (rows separated by `;`, entries by `,`).
pub fn parse_matrix(text: &str) -> Result<Vec<Vec<f64>>, String> {
    let rows: Vec<Vec<f64>> = text
        .split(';')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|row| {
            row.split(',')
                .map(|v| {
                    v.trim()
                        .parse::<f64>()
                        .map_err(|e| format!("invalid payoff '{}': {}", v.trim(), e))
                })
                .collect()
        })
        .collect::<Result<_, _>>()?;

    if rows.is_empty() {
        return Err("empty payoff matrix".into());
    }
    if rows.iter().any(|r| r.len() != rows[0].len()) {
        return Err("payoff rows have different lengths".into());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn textbook() -> Game {
        Game::from_rows(
            &[vec![25.0, 9.0], vec![33.0, 10.0]],
            &[vec![30.0, 13.0], vec![36.0, 12.0]],
        )
        .unwrap()
    }

    #[test]
    fn textbook_game_has_unique_pure_equilibrium() {
        let game = textbook();
        let eqs = game.support_enumeration();
        assert_eq!(eqs.len(), 1);
        let eq = &eqs[0];
        assert_eq!(eq.row_strategy, vec![0.0, 1.0]);
        assert_eq!(eq.col_strategy, vec![1.0, 0.0]);
        assert!(eq.is_pure());
        assert!(game.is_nash(eq));
        assert_eq!(game.expected_payoffs(eq), (33.0, 36.0));
    }

    #[test]
    fn textbook_game_is_not_zero_sum() {
        assert!(!textbook().is_zero_sum());
    }

    #[test]
    fn matching_pennies_is_zero_sum_with_mixed_equilibrium() {
        let game = Game::from_rows(
            &[vec![1.0, -1.0], vec![-1.0, 1.0]],
            &[vec![-1.0, 1.0], vec![1.0, -1.0]],
        )
        .unwrap();
        assert!(game.is_zero_sum());
        let eqs = game.support_enumeration();
        assert_eq!(eqs.len(), 1);
        assert_relative_eq!(eqs[0].row_strategy[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(eqs[0].col_strategy[1], 0.5, epsilon = 1e-12);
        assert!(!eqs[0].is_pure());
    }

    #[test]
    fn battle_of_the_sexes_has_three_equilibria() {
        let game = Game::from_rows(
            &[vec![3.0, 0.0], vec![0.0, 2.0]],
            &[vec![2.0, 0.0], vec![0.0, 3.0]],
        )
        .unwrap();
        let eqs = game.support_enumeration();
        assert_eq!(eqs.len(), 3);
        assert_eq!(eqs[0].row_strategy, vec![1.0, 0.0]);
        assert_eq!(eqs[1].row_strategy, vec![0.0, 1.0]);
        assert_relative_eq!(eqs[2].row_strategy[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(eqs[2].col_strategy[0], 0.4, epsilon = 1e-12);
        assert!(eqs.iter().all(|e| game.is_nash(e)));
    }

    #[test]
    fn rock_paper_scissors_uniform() {
        let a = vec![
            vec![0.0, -1.0, 1.0],
            vec![1.0, 0.0, -1.0],
            vec![-1.0, 1.0, 0.0],
        ];
        let b: Vec<Vec<f64>> = a.iter().map(|r| r.iter().map(|v| -v).collect()).collect();
        let game = Game::from_rows(&a, &b).unwrap();
        assert!(game.is_zero_sum());
        let eqs = game.support_enumeration();
        assert_eq!(eqs.len(), 1);
        for p in eqs[0].row_strategy.iter().chain(&eqs[0].col_strategy) {
            assert_relative_eq!(*p, 1.0 / 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn non_square_game() {
        // Row strategy 0 strictly dominates; column best-responds with 1.
        let game = Game::from_rows(
            &[vec![4.0, 5.0, 1.0], vec![0.0, 1.0, 0.0]],
            &[vec![1.0, 3.0, 2.0], vec![1.0, 0.0, 4.0]],
        )
        .unwrap();
        let eqs = game.support_enumeration();
        assert_eq!(eqs.len(), 1);
        assert_eq!(eqs[0].row_strategy, vec![1.0, 0.0]);
        assert_eq!(eqs[0].col_strategy, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn is_nash_rejects_profitable_deviation() {
        let game = textbook();
        let eq = Equilibrium {
            row_strategy: vec![1.0, 0.0],
            col_strategy: vec![1.0, 0.0],
        };
        assert!(!game.is_nash(&eq));
    }

    #[test]
    fn is_nash_rejects_wrong_length() {
        let eq = Equilibrium {
            row_strategy: vec![1.0],
            col_strategy: vec![1.0, 0.0],
        };
        assert!(!textbook().is_nash(&eq));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let err = Game::from_rows(&[vec![1.0, 2.0]], &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap_err();
        assert!(matches!(err, QuantError::DimensionMismatch { .. }));
        let err = Game::from_rows(&[vec![1.0, 2.0]], &[vec![1.0]]).unwrap_err();
        assert!(matches!(err, QuantError::DimensionMismatch { .. }));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Game::from_rows(&[vec![1.0, 2.0], vec![3.0]], &[vec![1.0, 2.0], vec![3.0]])
            .unwrap_err();
        assert!(matches!(err, QuantError::DimensionMismatch { .. }));
    }

    #[test]
    fn empty_game_is_rejected() {
        assert!(Game::from_rows(&[], &[]).is_err());
    }

    #[test]
    fn selection_last_keeps_final_equilibrium() {
        let eqs = vec![
            Equilibrium { row_strategy: vec![1.0, 0.0], col_strategy: vec![1.0, 0.0] },
            Equilibrium { row_strategy: vec![0.0, 1.0], col_strategy: vec![0.0, 1.0] },
        ];
        assert_eq!(Selection::All.apply(eqs.clone()).len(), 2);
        let last = Selection::Last.apply(eqs);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].row_strategy, vec![0.0, 1.0]);
        assert!(Selection::Last.apply(Vec::new()).is_empty());
    }

    #[test]
    fn combinations_in_lexicographic_order() {
        assert_eq!(
            combinations(4, 2),
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(combinations(2, 3), Vec::<Vec<usize>>::new());
        assert_eq!(combinations(3, 3), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn parse_matrix_rows_and_columns() {
        assert_eq!(
            parse_matrix("25,9;33,10").unwrap(),
            vec![vec![25.0, 9.0], vec![33.0, 10.0]]
        );
        assert_eq!(parse_matrix(" 1 , 2 ; 3 , 4 ;").unwrap().len(), 2);
        assert!(parse_matrix("1,2;3").is_err());
        assert!(parse_matrix("1,x").is_err());
        assert!(parse_matrix("").is_err());
    }

    #[test]
    fn display_formats_both_strategies() {
        let eq = Equilibrium {
            row_strategy: vec![0.0, 1.0],
            col_strategy: vec![1.0, 0.0],
        };
        assert_eq!(eq.to_string(), "row (0.0000, 1.0000), column (1.0000, 0.0000)");
    }
}
