//! Static table of the services discovery jobs can target
//!
//! Each entry names the CloudWatch namespace, a short alias accepted in the
//! configuration, and the resource type filters handed to the tag listing API.
//! Services without filters are discovered exclusively through extension hooks
//! (see [`crate::discovery::extensions`]).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub namespace: &'static str,
    pub alias: &'static str,
    pub resource_filters: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct SupportedServices(&'static [ServiceConfig]);

impl SupportedServices {
    pub const fn new(services: &'static [ServiceConfig]) -> Self {
        Self(services)
    }

    /// Look a service up by namespace or alias
    pub fn get_service(&self, name: &str) -> Option<&'static ServiceConfig> {
        self.0
            .iter()
            .find(|svc| svc.namespace == name || svc.alias == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ServiceConfig> {
        self.0.iter()
    }
}

pub static SUPPORTED_SERVICES: SupportedServices = SupportedServices::new(&[
    ServiceConfig {
        namespace: "AWS/ApiGateway",
        alias: "apigateway",
        resource_filters: &["apigateway"],
    },
    ServiceConfig {
        namespace: "AWS/ApplicationELB",
        alias: "alb",
        resource_filters: &[
            "elasticloadbalancing:loadbalancer/app",
            "elasticloadbalancing:targetgroup",
        ],
    },
    ServiceConfig {
        namespace: "AWS/AutoScaling",
        alias: "asg",
        resource_filters: &[],
    },
    ServiceConfig {
        namespace: "AWS/DynamoDB",
        alias: "dynamodb",
        resource_filters: &["dynamodb:table"],
    },
    ServiceConfig {
        namespace: "AWS/EC2",
        alias: "ec2",
        resource_filters: &["ec2:instance"],
    },
    ServiceConfig {
        namespace: "AWS/EC2Spot",
        alias: "ec2Spot",
        resource_filters: &[],
    },
    ServiceConfig {
        namespace: "AWS/Lambda",
        alias: "lambda",
        resource_filters: &["lambda:function"],
    },
    ServiceConfig {
        namespace: "AWS/RDS",
        alias: "rds",
        resource_filters: &["rds:db", "rds:cluster"],
    },
    ServiceConfig {
        namespace: "AWS/S3",
        alias: "s3",
        resource_filters: &["s3"],
    },
    ServiceConfig {
        namespace: "AWS/SQS",
        alias: "sqs",
        resource_filters: &["sqs"],
    },
]);
