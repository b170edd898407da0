//! `ShiftingExperimenter`, grounded in `original_source/vizier/_src/
//! benchmarks/experimenters/shifting_experimenter.py`: wraps an inner
//! experimenter and shifts every DOUBLE parameter's effective domain by a
//! fixed per-dimension offset, shrinking the advertised bounds so every
//! shifted value still lands inside the original domain, then undoes the
//! shift before delegating evaluation.

use crate::types::{ParameterType, Trial};

use super::{Experimenter, ExperimenterError, ProblemStatement};

/// Wraps an inner `Experimenter`, shifting each DOUBLE parameter's value by
/// a fixed per-dimension amount and shrinking its advertised bounds to
/// compensate.
#[derive(Debug)]
pub struct ShiftingExperimenter<E: Experimenter> {
    inner: E,
    shifts: Vec<f64>,
    problem_statement: ProblemStatement,
}

impl<E: Experimenter> ShiftingExperimenter<E> {
    /// Builds the wrapper. `shifts` must be broadcastable to the
    /// search-space dimension: either exactly one entry per parameter, in
    /// search-space order, or a single entry applied to every parameter
    /// (matching `np.broadcast_to(shift, (dimension,))` in the original).
    /// Rejects conditional search spaces, a zero-dimension search space,
    /// a non-broadcastable shift, non-DOUBLE parameters, and any shift
    /// whose magnitude would collapse or invert a parameter's bounds.
    pub fn new(inner: E, shifts: Vec<f64>) -> Result<Self, ExperimenterError> {
        let mut problem_statement = inner.problem_statement();
        if problem_statement.search_space.is_conditional {
            return Err(ExperimenterError::ConditionalSearchSpace(
                "ShiftingExperimenter".into(),
            ));
        }
        let params = &mut problem_statement.search_space.parameters;
        let dimension = params.len();
        if dimension == 0 {
            return Err(ExperimenterError::InvalidDimension(dimension));
        }
        let shifts = match shifts.len() {
            n if n == dimension => shifts,
            1 => vec![shifts[0]; dimension],
            provided => {
                return Err(ExperimenterError::NonBroadcastableShift { provided, dimension });
            }
        };

        for (param, &shift) in params.iter_mut().zip(&shifts) {
            if param.param_type != ParameterType::Double {
                return Err(ExperimenterError::NotDouble(param.name.clone()));
            }
            let bounds = param
                .bounds
                .ok_or_else(|| ExperimenterError::MissingBounds(param.name.clone()))?;
            if shift.abs() >= bounds.max_value - bounds.min_value {
                return Err(ExperimenterError::ShiftTooLarge {
                    shift,
                    min: bounds.min_value,
                    max: bounds.max_value,
                });
            }
            // Shrink the advertised domain so every value the caller can
            // suggest, once shifted, still falls within the original bounds.
            param.bounds = Some(crate::types::ParameterBounds {
                min_value: bounds.min_value - shift.min(0.0),
                max_value: bounds.max_value - shift.max(0.0),
            });
        }

        Ok(Self {
            inner,
            shifts,
            problem_statement,
        })
    }
}

impl<E: Experimenter> Experimenter for ShiftingExperimenter<E> {
    fn problem_statement(&self) -> ProblemStatement {
        self.problem_statement.clone()
    }

    fn evaluate(&self, suggestions: &mut [Trial]) -> Result<(), ExperimenterError> {
        let names: Vec<String> = self
            .problem_statement
            .search_space
            .parameters
            .iter()
            .map(|p| p.name.clone())
            .collect();

        for trial in suggestions.iter_mut() {
            for (name, &shift) in names.iter().zip(&self.shifts) {
                if let Some(value) = trial.parameters.get_mut(name) {
                    let crate::types::ParameterValue::Double(v) = value else {
                        return Err(ExperimenterError::NotDouble(name.clone()));
                    };
                    *v += shift;
                }
            }
        }

        self.inner.evaluate(suggestions)?;

        for trial in suggestions.iter_mut() {
            for (name, &shift) in names.iter().zip(&self.shifts) {
                if let Some(crate::types::ParameterValue::Double(v)) = trial.parameters.get_mut(name) {
                    *v -= shift;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Measurement, MetricSpec, ParameterConfig, ParameterDict, ParameterValue, SearchSpace, StudySpec};

    #[derive(Debug)]
    struct RecordingExperimenter(ProblemStatement, std::sync::Mutex<Vec<f64>>);
    impl Experimenter for RecordingExperimenter {
        fn problem_statement(&self) -> ProblemStatement {
            self.0.clone()
        }
        fn evaluate(&self, suggestions: &mut [Trial]) -> Result<(), ExperimenterError> {
            for trial in suggestions {
                let ParameterValue::Double(v) = trial.parameters["x"] else {
                    panic!("expected double");
                };
                self.1.lock().unwrap().push(v);
                trial.measurements.push(Measurement {
                    step: 1,
                    elapsed: std::time::Duration::from_secs(0),
                    metrics: [("y".to_string(), v)].into_iter().collect(),
                });
            }
            Ok(())
        }
    }

    fn double_problem() -> ProblemStatement {
        StudySpec {
            search_space: SearchSpace {
                parameters: vec![ParameterConfig::double("x", 0.0, 10.0)],
                is_conditional: false,
            },
            metrics: vec![MetricSpec {
                metric_id: "y".into(),
                goal: crate::types::Goal::Minimize,
            }],
            algorithm: "default".into(),
        }
    }

    fn two_dim_double_problem() -> ProblemStatement {
        StudySpec {
            search_space: SearchSpace {
                parameters: vec![
                    ParameterConfig::double("x", 0.0, 10.0),
                    ParameterConfig::double("y", 0.0, 10.0),
                ],
                is_conditional: false,
            },
            metrics: vec![MetricSpec {
                metric_id: "y".into(),
                goal: crate::types::Goal::Minimize,
            }],
            algorithm: "default".into(),
        }
    }

    #[test]
    fn broadcasts_a_single_shift_across_every_parameter() {
        let inner = RecordingExperimenter(two_dim_double_problem(), Default::default());
        let wrapper = ShiftingExperimenter::new(inner, vec![3.0]).unwrap();
        let bounds: Vec<_> = wrapper
            .problem_statement()
            .search_space
            .parameters
            .iter()
            .map(|p| p.bounds.unwrap())
            .collect();
        assert_eq!(bounds.len(), 2);
        for b in bounds {
            assert_eq!(b.min_value, 0.0);
            assert_eq!(b.max_value, 7.0);
        }
    }

    #[test]
    fn rejects_non_broadcastable_shift_count() {
        let inner = RecordingExperimenter(two_dim_double_problem(), Default::default());
        let err = ShiftingExperimenter::new(inner, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            ExperimenterError::NonBroadcastableShift {
                provided: 3,
                dimension: 2
            }
        ));
    }

    #[test]
    fn rejects_shift_too_large() {
        let inner = RecordingExperimenter(double_problem(), Default::default());
        let err = ShiftingExperimenter::new(inner, vec![10.0]).unwrap_err();
        assert!(matches!(err, ExperimenterError::ShiftTooLarge { .. }));
    }

    #[test]
    fn shrinks_bounds_by_shift_sign() {
        let inner = RecordingExperimenter(double_problem(), Default::default());
        let wrapper = ShiftingExperimenter::new(inner, vec![3.0]).unwrap();
        let bounds = wrapper.problem_statement().search_space.parameters[0].bounds.unwrap();
        assert_eq!(bounds.min_value, 0.0);
        assert_eq!(bounds.max_value, 7.0);
    }

    #[test]
    fn evaluate_shifts_then_restores() {
        let inner = RecordingExperimenter(double_problem(), Default::default());
        let wrapper = ShiftingExperimenter::new(inner, vec![3.0]).unwrap();

        let mut parameters = ParameterDict::new();
        parameters.insert("x".to_string(), ParameterValue::Double(2.0));
        let mut trial = Trial::new_requested(
            "o",
            "s",
            1,
            "owners/o/studies/s/trials/1".into(),
            parameters,
            chrono::Utc::now(),
        );

        wrapper.evaluate(std::slice::from_mut(&mut trial)).unwrap();

        assert_eq!(trial.parameters["x"], ParameterValue::Double(2.0));
        assert_eq!(trial.measurements[0].metrics["y"], 5.0);
    }
}
