// ============================================================================
// School Core - Built-in School Catalog
// File: crates/school-core/src/schema/school.rs
// Description: Entity and relationship declarations for the school domain
// ============================================================================
//! Tenant-global entities are the shared lookup tables listed under
//! `Module::Reference`. Everything else is partitioned by tenant.

use super::{DeletePolicy::*, EntityDef, FieldDef, FieldDef as F, Module, TenantScope};

const NAME: usize = 200;
const CODE: usize = 50;
const NOTE: usize = 1000;
const BODY: usize = 4000;

macro_rules! entity {
    ($name:literal, $table:literal, $module:ident, $scope:ident, [$($field:expr),* $(,)?]) => {
        EntityDef {
            name: $name,
            table: $table,
            module: Module::$module,
            scope: TenantScope::$scope,
            fields: {
                const FIELDS: &[FieldDef] = &[$($field),*];
                FIELDS
            },
        }
    };
}

pub(super) fn entities() -> Vec<EntityDef> {
    let mut all = Vec::new();
    all.extend(reference());
    all.extend(academics());
    all.extend(human_resources());
    all.extend(billing());
    all.extend(exams());
    all.extend(documents());
    all.extend(workspace());
    all
}

fn reference() -> Vec<EntityDef> {
    vec![
        entity!("attendance_status", "attendance_statuses", Reference, Global, [
            F::text("name", NAME).required(),
            F::text("code", CODE),
            F::boolean("counts_as_present"),
        ]),
        entity!("gender", "genders", Reference, Global, [
            F::text("name", NAME).required(),
        ]),
        entity!("blood_group", "blood_groups", Reference, Global, [
            F::text("name", CODE).required(),
        ]),
        entity!("grade_level", "grade_levels", Reference, Global, [
            F::text("name", NAME).required(),
            F::integer("sequence"),
        ]),
        entity!("document_type", "document_types", Reference, Global, [
            F::text("name", NAME).required(),
            F::text("description", NOTE),
        ]),
        entity!("document_status", "document_statuses", Reference, Global, [
            F::text("name", NAME).required(),
        ]),
        entity!("payment_method", "payment_methods", Reference, Global, [
            F::text("name", NAME).required(),
        ]),
    ]
}

fn academics() -> Vec<EntityDef> {
    vec![
        entity!("academic_year", "academic_years", Academics, Tenant, [
            F::text("name", NAME).required(),
            F::date("start_date"),
            F::date("end_date"),
            F::boolean("is_current"),
        ]),
        entity!("semester", "semesters", Academics, Tenant, [
            F::text("name", NAME).required(),
            F::reference("academic_year_id", "academic_year", Restrict).required(),
            F::date("start_date"),
            F::date("end_date"),
        ]),
        entity!("department", "departments", Academics, Tenant, [
            F::text("name", NAME).required(),
            F::text("code", CODE),
        ]),
        entity!("subject", "subjects", Academics, Tenant, [
            F::text("name", NAME).required(),
            F::text("code", CODE),
            F::reference("department_id", "department", SetNull),
        ]),
        entity!("course", "courses", Academics, Tenant, [
            F::text("name", NAME).required(),
            F::text("code", CODE),
            F::integer("credits"),
            F::reference("subject_id", "subject", SetNull),
            F::reference("semester_id", "semester", SetNull),
        ]),
        entity!("class_room", "class_rooms", Academics, Tenant, [
            F::text("name", NAME).required(),
            F::text("building", NAME),
            F::integer("capacity"),
        ]),
        entity!("section", "sections", Academics, Tenant, [
            F::text("name", NAME).required(),
            F::reference("grade_level_id", "grade_level", Restrict),
            F::reference("academic_year_id", "academic_year", Restrict).required(),
            F::reference("class_room_id", "class_room", SetNull),
        ]),
        entity!("guardian", "guardians", Academics, Tenant, [
            F::text("name", NAME).required(),
            F::text("relationship", CODE),
            F::text("phone", CODE),
            F::text("email", NAME),
        ]),
        entity!("student", "students", Academics, Tenant, [
            F::text("name", NAME).required(),
            F::date("date_of_birth"),
            F::text("admission_number", CODE),
            F::date("admission_date"),
            F::text("email", NAME),
            F::reference("gender_id", "gender", SetNull),
            F::reference("blood_group_id", "blood_group", SetNull),
            F::reference("guardian_id", "guardian", SetNull),
            F::reference("section_id", "section", SetNull),
        ]),
        entity!("enrollment", "enrollments", Academics, Tenant, [
            F::reference("student_id", "student", Restrict).required(),
            F::reference("course_id", "course", Restrict).required(),
            F::date("enrolled_on"),
            F::text("status", CODE),
        ]),
        entity!("attendance", "attendances", Academics, Tenant, [
            F::reference("student_id", "student", Restrict).required(),
            F::reference("attendance_status_id", "attendance_status", Restrict).required(),
            F::reference("section_id", "section", SetNull),
            F::date("attendance_date").required(),
            F::text("remarks", NOTE),
        ]),
        entity!("timetable_entry", "timetable_entries", Academics, Tenant, [
            F::reference("section_id", "section", Restrict).required(),
            F::reference("course_id", "course", Restrict).required(),
            F::reference("teacher_id", "teacher", SetNull),
            F::reference("class_room_id", "class_room", SetNull),
            F::integer("day_of_week").required(),
            F::text("starts_at", 5),
            F::text("ends_at", 5),
        ]),
    ]
}

fn human_resources() -> Vec<EntityDef> {
    vec![
        entity!("designation", "designations", HumanResources, Tenant, [
            F::text("name", NAME).required(),
        ]),
        entity!("employee", "employees", HumanResources, Tenant, [
            F::text("name", NAME).required(),
            F::text("employee_number", CODE),
            F::text("email", NAME),
            F::text("phone", CODE),
            F::date("hire_date"),
            F::reference("department_id", "department", SetNull),
            F::reference("designation_id", "designation", SetNull),
            F::reference("gender_id", "gender", SetNull),
        ]),
        entity!("teacher", "teachers", HumanResources, Tenant, [
            F::reference("employee_id", "employee", Restrict).required(),
            F::reference("subject_id", "subject", SetNull),
            F::text("specialization", NAME),
        ]),
        entity!("salary_structure", "salary_structures", HumanResources, Tenant, [
            F::text("name", NAME).required(),
            F::integer("basic_minor").required(),
            F::integer("allowance_minor"),
            F::integer("deduction_minor"),
        ]),
        entity!("payroll", "payrolls", HumanResources, Tenant, [
            F::reference("employee_id", "employee", Restrict).required(),
            F::reference("salary_structure_id", "salary_structure", SetNull),
            F::date("period_start").required(),
            F::date("period_end").required(),
            F::integer("gross_minor"),
            F::integer("net_minor"),
            F::datetime("paid_on"),
        ]),
        entity!("payroll_item", "payroll_items", HumanResources, Tenant, [
            F::reference("payroll_id", "payroll", Restrict).required(),
            F::text("label", NAME).required(),
            F::integer("amount_minor").required(),
        ]),
        entity!("leave_request", "leave_requests", HumanResources, Tenant, [
            F::reference("employee_id", "employee", Restrict).required(),
            F::date("start_date").required(),
            F::date("end_date").required(),
            F::text("reason", NOTE),
            F::text("status", CODE),
        ]),
    ]
}

fn billing() -> Vec<EntityDef> {
    vec![
        entity!("fee_type", "fee_types", Billing, Tenant, [
            F::text("name", NAME).required(),
            F::integer("amount_minor").required(),
            F::text("description", NOTE),
        ]),
        entity!("fee", "fees", Billing, Tenant, [
            F::reference("student_id", "student", Restrict).required(),
            F::reference("fee_type_id", "fee_type", Restrict).required(),
            F::reference("academic_year_id", "academic_year", SetNull),
            F::integer("amount_minor").required(),
            F::date("due_date"),
        ]),
        entity!("invoice", "invoices", Billing, Tenant, [
            F::reference("student_id", "student", Restrict).required(),
            F::text("invoice_number", CODE).required(),
            F::date("issued_on"),
            F::date("due_date"),
            F::integer("total_minor"),
            F::text("status", CODE),
        ]),
        entity!("invoice_line", "invoice_lines", Billing, Tenant, [
            F::reference("invoice_id", "invoice", Restrict).required(),
            F::reference("fee_id", "fee", SetNull),
            F::text("description", NAME).required(),
            F::integer("amount_minor").required(),
        ]),
        entity!("payment", "payments", Billing, Tenant, [
            F::reference("invoice_id", "invoice", Restrict).required(),
            F::reference("payment_method_id", "payment_method", Restrict),
            F::integer("amount_minor").required(),
            F::datetime("paid_on").required(),
            F::text("reference", NAME),
        ]),
    ]
}

fn exams() -> Vec<EntityDef> {
    vec![
        entity!("exam_type", "exam_types", Exams, Tenant, [
            F::text("name", NAME).required(),
        ]),
        entity!("exam", "exams", Exams, Tenant, [
            F::text("name", NAME).required(),
            F::reference("exam_type_id", "exam_type", SetNull),
            F::reference("course_id", "course", Restrict).required(),
            F::reference("semester_id", "semester", SetNull),
            F::date("exam_date"),
            F::float("max_marks"),
        ]),
        entity!("exam_result", "exam_results", Exams, Tenant, [
            F::reference("exam_id", "exam", Restrict).required(),
            F::reference("student_id", "student", Restrict).required(),
            F::float("marks"),
            F::text("grade", CODE),
            F::text("remarks", NOTE),
        ]),
        entity!("grade_scale", "grade_scales", Exams, Tenant, [
            F::text("name", CODE).required(),
            F::float("min_percent").required(),
            F::float("max_percent").required(),
            F::float("grade_point"),
        ]),
    ]
}

fn documents() -> Vec<EntityDef> {
    vec![
        entity!("document_category", "document_categories", Documents, Tenant, [
            F::text("name", NAME).required(),
            F::reference("parent_id", "document_category", SetNull),
        ]),
        entity!("document", "documents", Documents, Tenant, [
            F::text("title", NAME).required(),
            F::text("description", NOTE),
            F::reference("document_type_id", "document_type", Restrict).required(),
            F::reference("document_category_id", "document_category", SetNull),
            F::reference("document_status_id", "document_status", Restrict),
            F::reference("document_version_id", "document_version", SetNull),
            F::reference("owner_id", "employee", SetNull),
        ]),
        entity!("document_version", "document_versions", Documents, Tenant, [
            F::reference("document_id", "document", Restrict).required(),
            F::integer("version_number").required(),
            F::text("file_name", NAME).required(),
            F::text("storage_path", NOTE),
            F::datetime("uploaded_on"),
        ]),
    ]
}

fn workspace() -> Vec<EntityDef> {
    vec![
        entity!("workspace", "workspaces", Workspace, Tenant, [
            F::text("name", NAME).required(),
            F::text("description", NOTE),
        ]),
        entity!("workspace_member", "workspace_members", Workspace, Tenant, [
            F::reference("workspace_id", "workspace", Restrict).required(),
            F::reference("employee_id", "employee", Restrict).required(),
            F::text("role", CODE),
        ]),
        entity!("workspace_task", "workspace_tasks", Workspace, Tenant, [
            F::reference("workspace_id", "workspace", Restrict).required(),
            F::text("title", NAME).required(),
            F::text("details", BODY),
            F::reference("assignee_id", "employee", SetNull),
            F::datetime("due_on"),
            F::text("status", CODE),
        ]),
        entity!("announcement", "announcements", Workspace, Tenant, [
            F::text("title", NAME).required(),
            F::text("body", BODY),
            F::datetime("published_on"),
            F::reference("workspace_id", "workspace", SetNull),
        ]),
    ]
}
