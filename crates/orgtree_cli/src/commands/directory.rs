use miette::Result;
use orgtree_core::{DepartmentId, Directory, OperationContext, PersonnelId, PositionId};
use serde_json::json;

use crate::output::Output;

/// Show the acting user's team
pub async fn team(directory: &Directory, context: &OperationContext) -> Result<()> {
    let team = directory.team(context).await?;
    tracing::info!(members = team.len(), "team resolved");

    Output::new().json(&team)
}

/// List subordinate positions of `position`
pub async fn subordinates(directory: &Directory, position: &str, fallback: bool) -> Result<()> {
    let positions = directory
        .resolve_occupied_subordinates(&PositionId::new(position), fallback)
        .await?;

    Output::new().json(&positions)
}

/// Show a personnel record with its department and the department's manager
pub async fn user(directory: &Directory, context: &OperationContext, id: &str) -> Result<()> {
    let user = directory.user_by_id(context, &PersonnelId::new(id)).await?;
    let department = directory.user_department(&user, true).await?;

    Output::new().json(&json!({
        "user": user,
        "department": department,
        "is_laborer": directory.is_user_laborer(&user),
        "is_mse": directory.is_user_mse(&user),
    }))
}

/// Show the department headed by `id`, or by the acting user
pub async fn managed_department(
    directory: &Directory,
    context: &OperationContext,
    id: Option<&str>,
) -> Result<()> {
    let user = match id {
        Some(id) => directory.user_by_id(context, &PersonnelId::new(id)).await?,
        None => context.require_auth_user("managed-department")?.clone(),
    };

    let department = directory.user_managed_department(&user).await?;
    if department.is_none() {
        tracing::info!(user_id = %user.id, "user does not head a department");
    }

    Output::new().json(&department)
}

/// Check whether the acting user manages every one of `departments`
pub async fn can_manage(
    directory: &Directory,
    context: &OperationContext,
    departments: &[String],
) -> Result<()> {
    let ids: Vec<DepartmentId> = departments.iter().map(DepartmentId::new).collect();
    let allowed = directory
        .are_departments_in_user_management(context, &ids)
        .await?;

    Output::new().json(&json!({
        "departments": ids,
        "can_manage": allowed,
    }))
}
