//! Declarative macros for pipeline DSL
//!
//! This module contains macros for defining pipelines in a
//! declarative syntax similar to Jenkins Pipeline.

/// Creates a shell command step
#[macro_export]
macro_rules! sh {
    ($cmd:expr) => {
        $crate::pipeline::Step::shell($cmd)
    };
}

/// Creates an echo step
#[macro_export]
macro_rules! echo {
    ($msg:expr) => {
        $crate::pipeline::Step::echo($msg)
    };
}

/// Creates a code analysis step
#[macro_export]
macro_rules! sonar_scan {
    ($cmd:expr) => {
        $crate::pipeline::Step::sonar_scan($cmd)
    };
}

/// Creates a quality gate step, optionally with a timeout in seconds
#[macro_export]
macro_rules! quality_gate {
    () => {
        $crate::pipeline::Step::quality_gate()
    };
    ($secs:expr) => {
        $crate::pipeline::Step::quality_gate_with_timeout($secs)
    };
}

/// Creates an archive step
#[macro_export]
macro_rules! archive {
    ($pattern:expr) => {
        $crate::pipeline::Step::archive_artifacts($pattern)
    };
}

/// Creates an artifact upload step from `group:artifact:version` and packaging
#[macro_export]
macro_rules! nexus_upload {
    ($group:expr, $artifact:expr, $version:expr, $packaging:expr) => {
        $crate::pipeline::Step::nexus_upload($crate::pipeline::UploadSpec::new(
            $group, $artifact, $version, $packaging,
        ))
    };
}

/// Creates a stage
#[macro_export]
macro_rules! stage {
    ($name:expr, $steps:expr) => {
        $crate::pipeline::Stage::new($name, $steps)
    };
    ($name:expr, $steps:expr, post: $post:expr) => {
        $crate::pipeline::StageBuilder::new($name)
            .steps($steps)
            .posts($post)
            .build_unchecked()
    };
}

/// Creates a list of steps
#[macro_export]
macro_rules! steps {
    ($($step:expr),* $(,)?) => {
        vec![$($step),*]
    };
}

/// Creates post-conditions
#[macro_export]
macro_rules! post {
    ( $( $cond:ident ( $($steps:expr),* $(,)? ) ),* $(,)? ) => {{
        vec![
            $(
                $crate::pipeline::PostCondition::$cond(vec![$($steps),*]),
            )*
        ]
    }};
}

/// Creates a pipeline from a name and its stages
#[macro_export]
macro_rules! pipeline {
    ($name:expr, stages { $( $stage:expr ),* $(,)? }) => {{
        $crate::pipeline::Pipeline::builder()
            .name($name)
            .stages(vec![$($stage),*])
            .build_unchecked()
    }};
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{PostCondition, StepType, Validate};

    #[test]
    fn test_step_macros() {
        assert_eq!(sh!("mvn install").step_type, StepType::shell("mvn install"));
        assert_eq!(echo!("done").step_type, StepType::echo("done"));
        assert_eq!(
            quality_gate!(600).step_type,
            StepType::QualityGate {
                timeout_secs: Some(600)
            }
        );
        assert_eq!(
            quality_gate!().step_type,
            StepType::QualityGate { timeout_secs: None }
        );
        assert_eq!(
            archive!("**/*.war").step_type,
            StepType::archive_artifacts("**/*.war")
        );
    }

    #[test]
    fn test_post_macro() {
        let post = post!(success(echo!("ok"), archive!("**/*.war")), always(echo!("bye")));

        assert_eq!(post.len(), 2);
        assert!(matches!(&post[0], PostCondition::Success { steps } if steps.len() == 2));
        assert!(matches!(&post[1], PostCondition::Always { .. }));
    }

    #[test]
    fn test_pipeline_macro() {
        let pipeline = pipeline!("vprofile", stages {
            stage!("Build", steps!(sh!("mvn -s settings.xml -DskipTests install")),
                post: post!(success(echo!("Now Archiving."), archive!("**/*.war")))),
            stage!("CODE ANALYSIS with SONARQUBE", steps!(
                sonar_scan!("sonar-scanner -Dsonar.projectKey=vprofile"),
                quality_gate!(600),
            )),
            stage!("UPLOAD ARTIFACT", steps!(
                nexus_upload!("QA", "vproapp", "${BUILD_ID}-${BUILD_TIMESTAMP}", "war"),
            )),
        });

        assert_eq!(pipeline.name.as_deref(), Some("vprofile"));
        assert_eq!(pipeline.stage_count(), 3);
        assert_eq!(pipeline.stages[0].post.len(), 1);
        assert!(pipeline.validate().is_ok());
    }
}
