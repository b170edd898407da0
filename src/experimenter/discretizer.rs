//! `DiscretizingExperimenter`, grounded in `original_source/vizier/_src/
//! benchmarks/experimenters/discretizing_experimenter.py`: wraps an inner
//! experimenter and rewrites a subset of its DOUBLE parameters to a fixed
//! discrete grid of feasible values, restoring the original double value
//! before delegating evaluation so the inner experimenter never observes
//! the discretization.

use std::collections::HashMap;

use crate::types::{ParameterConfig, ParameterType, ParameterValue};

use super::{Experimenter, ExperimenterError, ProblemStatement};

/// Wraps an inner `Experimenter`, presenting a subset of its DOUBLE
/// parameters as DISCRETE with a caller-supplied feasible-value grid.
#[derive(Debug)]
pub struct DiscretizingExperimenter<E: Experimenter> {
    inner: E,
    discretization: HashMap<String, Vec<f64>>,
    check_evaluation: bool,
    problem_statement: ProblemStatement,
}

impl<E: Experimenter> DiscretizingExperimenter<E> {
    /// Builds the wrapper, rejecting the inner problem statement if it is
    /// conditional or if any discretized parameter is unknown, non-DOUBLE,
    /// or has a declared value outside its original bounds.
    pub fn new(
        inner: E,
        discretization: HashMap<String, Vec<f64>>,
        check_evaluation: bool,
    ) -> Result<Self, ExperimenterError> {
        let mut problem_statement = inner.problem_statement();
        if problem_statement.search_space.is_conditional {
            return Err(ExperimenterError::ConditionalSearchSpace(
                "DiscretizingExperimenter".into(),
            ));
        }

        for (name, values) in &discretization {
            let param = problem_statement
                .search_space
                .parameters
                .iter_mut()
                .find(|p| &p.name == name)
                .ok_or_else(|| ExperimenterError::UnknownParameter(name.clone()))?;
            if param.param_type != ParameterType::Double {
                return Err(ExperimenterError::NotDouble(name.clone()));
            }
            let bounds = param
                .bounds
                .ok_or_else(|| ExperimenterError::MissingBounds(name.clone()))?;
            for &value in values {
                if value < bounds.min_value || value > bounds.max_value {
                    return Err(ExperimenterError::ValueOutOfBounds {
                        name: name.clone(),
                        value,
                        min: bounds.min_value,
                        max: bounds.max_value,
                    });
                }
            }
            *param = ParameterConfig {
                name: name.clone(),
                param_type: ParameterType::Discrete,
                bounds: param.bounds,
                feasible_values: values.clone(),
            };
        }

        Ok(Self {
            inner,
            discretization,
            check_evaluation,
            problem_statement,
        })
    }
}

impl<E: Experimenter> Experimenter for DiscretizingExperimenter<E> {
    fn problem_statement(&self) -> ProblemStatement {
        self.problem_statement.clone()
    }

    fn evaluate(&self, suggestions: &mut [crate::types::Trial]) -> Result<(), ExperimenterError> {
        // Remember the discretized assignments so they can be restored once
        // the inner experimenter has written its measurements.
        let mut originals: Vec<Vec<(String, ParameterValue)>> = Vec::with_capacity(suggestions.len());

        for trial in suggestions.iter_mut() {
            let mut saved = Vec::new();
            for (name, feasible_values) in &self.discretization {
                let Some(current) = trial.parameters.get(name).cloned() else {
                    continue;
                };
                let value = current
                    .as_float()
                    .ok_or_else(|| ExperimenterError::NotDouble(name.clone()))?;
                if self.check_evaluation && !feasible_values.contains(&value) {
                    return Err(ExperimenterError::InfeasibleValue {
                        name: name.clone(),
                        value,
                    });
                }
                saved.push((name.clone(), current));
                trial.parameters.insert(name.clone(), ParameterValue::Double(value));
            }
            originals.push(saved);
        }

        self.inner.evaluate(suggestions)?;

        for (trial, saved) in suggestions.iter_mut().zip(originals) {
            for (name, original) in saved {
                trial.parameters.insert(name, original);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricSpec, ParameterDict, SearchSpace, StudySpec, Trial};

    #[derive(Debug)]
    struct NoopExperimenter(ProblemStatement);
    impl Experimenter for NoopExperimenter {
        fn problem_statement(&self) -> ProblemStatement {
            self.0.clone()
        }
        fn evaluate(&self, suggestions: &mut [Trial]) -> Result<(), ExperimenterError> {
            for trial in suggestions {
                trial.measurements.push(crate::types::Measurement {
                    step: 1,
                    elapsed: std::time::Duration::from_secs(0),
                    metrics: [("y".to_string(), 0.0)].into_iter().collect(),
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

    #[test]
    fn rejects_unknown_parameter() {
        let inner = NoopExperimenter(double_problem());
        let discretization = [("z".to_string(), vec![0.0, 5.0, 10.0])].into_iter().collect();
        let err = DiscretizingExperimenter::new(inner, discretization, true).unwrap_err();
        assert!(matches!(err, ExperimenterError::UnknownParameter(name) if name == "z"));
    }

    #[test]
    fn rejects_out_of_bounds_value() {
        let inner = NoopExperimenter(double_problem());
        let discretization = [("x".to_string(), vec![0.0, 5.0, 11.0])].into_iter().collect();
        let err = DiscretizingExperimenter::new(inner, discretization, true).unwrap_err();
        assert!(matches!(err, ExperimenterError::ValueOutOfBounds { .. }));
    }

    #[test]
    fn evaluate_restores_original_value_after_delegating() {
        let inner = NoopExperimenter(double_problem());
        let discretization = [("x".to_string(), vec![0.0, 5.0, 10.0])].into_iter().collect();
        let wrapper = DiscretizingExperimenter::new(inner, discretization, true).unwrap();

        let mut parameters = ParameterDict::new();
        parameters.insert("x".to_string(), ParameterValue::Discrete(5.0));
        let mut trial = Trial::new_requested(
            "o",
            "s",
            1,
            "owners/o/studies/s/trials/1".into(),
            parameters,
            chrono::Utc::now(),
        );

        wrapper.evaluate(std::slice::from_mut(&mut trial)).unwrap();

        assert_eq!(trial.parameters["x"], ParameterValue::Discrete(5.0));
        assert_eq!(trial.measurements.len(), 1);
    }

    #[test]
    fn evaluate_rejects_infeasible_value_when_checked() {
        let inner = NoopExperimenter(double_problem());
        let discretization = [("x".to_string(), vec![0.0, 5.0, 10.0])].into_iter().collect();
        let wrapper = DiscretizingExperimenter::new(inner, discretization, true).unwrap();

        let mut parameters = ParameterDict::new();
        parameters.insert("x".to_string(), ParameterValue::Discrete(3.0));
        let mut trial = Trial::new_requested(
            "o",
            "s",
            1,
            "owners/o/studies/s/trials/1".into(),
            parameters,
            chrono::Utc::now(),
        );

        let err = wrapper.evaluate(std::slice::from_mut(&mut trial)).unwrap_err();
        assert!(matches!(err, ExperimenterError::InfeasibleValue { .. }));
    }
}
